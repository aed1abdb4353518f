// libs/appointment-cell/src/services/reminders.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use schedule_cell::time::parse_hhmm;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::scheduling::{Appointment, AppointmentStatus};

use crate::models::{AppointmentError, Reminder};

/// Delivery channel for reminders (push, SMS, in-app). Delivery itself lives
/// outside this crate.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), AppointmentError>;
}

/// Logs each reminder.
pub struct TracingReminderSink;

#[async_trait]
impl ReminderSink for TracingReminderSink {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), AppointmentError> {
        info!(
            appointment_id = %reminder.appointment_id,
            client_id = %reminder.client_id,
            starts_at = %reminder.starts_at,
            "Reminder: {} with {}", reminder.service_name, reminder.professional_name
        );
        Ok(())
    }
}

pub fn appointment_start(appointment: &Appointment) -> Option<NaiveDateTime> {
    parse_hhmm(&appointment.time).map(|time| appointment.date.and_time(time))
}

/// Upcoming appointments starting in `(now, now + lead]` that were not reminded yet.
pub fn due_reminders(
    appointments: &[Appointment],
    now: NaiveDateTime,
    lead: Duration,
    sent: &HashMap<Uuid, NaiveDateTime>,
) -> Vec<Reminder> {
    let window_end = now + lead;

    appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Upcoming)
        .filter(|a| !sent.contains_key(&a.id))
        .filter_map(|a| {
            let starts_at = appointment_start(a)?;
            (starts_at > now && starts_at <= window_end).then(|| Reminder {
                appointment_id: a.id,
                client_id: a.client_id,
                client_name: a.client_name.clone(),
                professional_name: a.professional_name.clone(),
                service_name: a.service_name.clone(),
                health_unit: a.health_unit.clone(),
                starts_at,
            })
        })
        .collect()
}

pub struct ReminderService {
    supabase: Arc<SupabaseClient>,
    sink: Arc<dyn ReminderSink>,
    poll_interval: std::time::Duration,
    lead: Duration,
    /// Appointment id -> start time, pruned once the start has passed.
    sent: Mutex<HashMap<Uuid, NaiveDateTime>>,
    is_running: RwLock<bool>,
}

impl ReminderService {
    pub fn new(supabase: Arc<SupabaseClient>, sink: Arc<dyn ReminderSink>, config: &AppConfig) -> Self {
        Self::with_settings(
            supabase,
            sink,
            std::time::Duration::from_secs(config.reminder_poll_interval_secs.max(1)),
            Duration::minutes(config.reminder_lead_minutes.max(0)),
        )
    }

    pub fn with_settings(
        supabase: Arc<SupabaseClient>,
        sink: Arc<dyn ReminderSink>,
        poll_interval: std::time::Duration,
        lead: Duration,
    ) -> Self {
        Self {
            supabase,
            sink,
            poll_interval,
            lead,
            sent: Mutex::new(HashMap::new()),
            is_running: RwLock::new(false),
        }
    }

    /// One poll. A failed delivery is retried on the next tick.
    pub async fn run_once(&self, now: NaiveDateTime) -> Result<usize, AppointmentError> {
        let appointments = self.fetch_window(now).await?;

        let mut sent = self.sent.lock().await;
        sent.retain(|_, starts_at| *starts_at > now);

        let due = due_reminders(&appointments, now, self.lead, &sent);
        let mut delivered = 0;

        for reminder in due {
            match self.sink.deliver(&reminder).await {
                Ok(()) => {
                    sent.insert(reminder.appointment_id, reminder.starts_at);
                    delivered += 1;
                }
                Err(e) => warn!("Reminder for {} not delivered: {}", reminder.appointment_id, e),
            }
        }

        Ok(delivered)
    }

    /// Polls until `shutdown` is called. Never touches request handling.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        {
            let mut running = self.is_running.write().await;
            if *running {
                warn!("Reminder poll is already running");
                return;
            }
            *running = true;
        }

        info!("Starting reminder poll every {:?} with {} min lead",
              self.poll_interval, self.lead.num_minutes());

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if !*self.is_running.read().await {
                debug!("Reminder poll stopping due to shutdown");
                break;
            }

            match self.run_once(Local::now().naive_local()).await {
                Ok(0) => debug!("No reminders due"),
                Ok(count) => info!("Delivered {} reminder(s)", count),
                Err(e) => error!("Reminder poll failed: {}", e),
            }
        }

        debug!("Reminder poll ended");
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.start().await })
    }

    pub async fn shutdown(&self) {
        let mut running = self.is_running.write().await;
        *running = false;
    }

    async fn fetch_window(&self, now: NaiveDateTime) -> Result<Vec<Appointment>, AppointmentError> {
        let window_end = now + self.lead;
        let path = format!(
            "/rest/v1/appointments?date=gte.{}&date=lte.{}&status=eq.upcoming&order=date.asc,time.asc",
            now.date(),
            window_end.date()
        );

        // No user session here, so the read goes out with the anon key alone.
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(rows.into_iter()
            .filter_map(|row| match serde_json::from_value::<Appointment>(row) {
                Ok(appointment) => Some(appointment),
                Err(e) => {
                    warn!("Skipping unreadable appointment row: {}", e);
                    None
                }
            })
            .collect())
    }
}
