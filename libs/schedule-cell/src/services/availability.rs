// libs/schedule-cell/src/services/availability.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{
    Availability, ProfessionalProfile, ProfessionalSettings, ScheduleError, TimeSlot, WorkSchedule,
};
use crate::services::slots::{generate_slots, working_days};
use crate::time::{is_on_slot_grid, normalize_time};

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    time: String,
}

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn get_profile(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<ProfessionalProfile, ScheduleError> {
        debug!("Fetching profile for professional {}", professional_id);

        let path = format!(
            "/rest/v1/profiles?id=eq.{}&select=id,full_name,health_unit,settings",
            professional_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ScheduleError::ProfessionalNotFound)?;

        serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("Failed to parse profile: {}", e)))
    }

    pub async fn get_settings(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        Ok(self.get_profile(professional_id, auth_token).await?.settings_or_default())
    }

    /// Writes the whole settings object back; there is no field-level merge.
    pub async fn save_settings(
        &self,
        professional_id: Uuid,
        settings: &ProfessionalSettings,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        settings.validate()?;

        let path = format!("/rest/v1/profiles?id=eq.{}", professional_id);
        let result = self.supabase.write_returning(
            Method::PATCH,
            &path,
            Some(auth_token),
            json!({ "settings": settings }),
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        let row = result.into_iter().next().ok_or(ScheduleError::ProfessionalNotFound)?;
        let profile: ProfessionalProfile = serde_json::from_value(row)
            .map_err(|e| ScheduleError::Database(format!("Failed to parse profile: {}", e)))?;

        info!("Settings saved for professional {}", professional_id);
        Ok(profile.settings_or_default())
    }

    pub async fn set_work_schedules(
        &self,
        professional_id: Uuid,
        schedules: Vec<WorkSchedule>,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        for schedule in &schedules {
            schedule.validate()?;
        }

        let mut settings = self.get_settings(professional_id, auth_token).await?;
        settings.work_schedules = schedules;
        self.save_settings(professional_id, &settings, auth_token).await
    }

    pub async fn block_day(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        let mut settings = self.get_settings(professional_id, auth_token).await?;
        if !settings.blocked_days.insert(date) {
            debug!("Day {} already blocked for {}", date, professional_id);
            return Ok(settings);
        }
        self.save_settings(professional_id, &settings, auth_token).await
    }

    pub async fn unblock_day(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        let mut settings = self.get_settings(professional_id, auth_token).await?;
        if !settings.blocked_days.remove(&date) {
            return Ok(settings);
        }
        self.save_settings(professional_id, &settings, auth_token).await
    }

    pub async fn block_time_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        time: &str,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        let time = slot_time(time)?;

        let mut settings = self.get_settings(professional_id, auth_token).await?;
        if !settings.blocked_time_slots.entry(date).or_default().insert(time) {
            return Ok(settings);
        }
        self.save_settings(professional_id, &settings, auth_token).await
    }

    pub async fn unblock_time_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        time: &str,
        auth_token: &str,
    ) -> Result<ProfessionalSettings, ScheduleError> {
        let time = slot_time(time)?;

        let mut settings = self.get_settings(professional_id, auth_token).await?;
        let removed = match settings.blocked_time_slots.get_mut(&date) {
            Some(times) => {
                let removed = times.remove(&time);
                if times.is_empty() {
                    settings.blocked_time_slots.remove(&date);
                }
                removed
            }
            None => false,
        };

        if !removed {
            return Ok(settings);
        }
        self.save_settings(professional_id, &settings, auth_token).await
    }

    /// Times of the professional's non-cancelled appointments on `date`.
    pub async fn booked_times(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<BTreeSet<String>, ScheduleError> {
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&date=eq.{}&status=neq.cancelled&select=time",
            professional_id, date
        );
        let rows: Vec<BookedTimeRow> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::Database(e.to_string()))?;

        Ok(rows.into_iter().filter_map(|row| normalize_time(&row.time)).collect())
    }

    pub async fn available_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        self.available_slots_at(professional_id, date, Local::now().naive_local(), auth_token).await
    }

    pub async fn available_slots_at(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        debug!("Calculating available slots for professional {} on {}", professional_id, date);

        let profile = self.get_profile(professional_id, auth_token).await?;
        let settings = profile.settings_or_default();
        let availability = Availability::from_settings(&settings, profile.implied_unit());

        // A blocked day needs no booking lookup.
        if availability.blocked_days.contains(&date) {
            return Ok(Vec::new());
        }

        let booked = self.booked_times(professional_id, date, auth_token).await?;
        let blocked = settings.blocked_times_on(date);

        let slots = generate_slots(date, &availability, &booked, &blocked, now);
        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }

    pub async fn working_days(
        &self,
        professional_id: Uuid,
        from: NaiveDate,
        days: u32,
        auth_token: &str,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        let profile = self.get_profile(professional_id, auth_token).await?;
        let availability = Availability::from_settings(&profile.settings_or_default(), profile.implied_unit());
        Ok(working_days(&availability, from, days))
    }
}

fn slot_time(raw: &str) -> Result<String, ScheduleError> {
    if !is_on_slot_grid(raw) {
        return Err(ScheduleError::Validation(format!(
            "'{}' is not a HH:MM half-hour boundary", raw
        )));
    }
    normalize_time(raw).ok_or_else(|| ScheduleError::Validation(format!("Invalid time '{}'", raw)))
}
