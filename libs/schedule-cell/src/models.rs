// libs/schedule-cell/src/models.rs
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::time::{is_on_slot_grid, minutes_of_day, next_slot_boundary, normalize_time, parse_hhmm};

/// Unit name used when a legacy schedule's profile carries none.
pub const DEFAULT_UNIT_NAME: &str = "Unidade de Saúde";

// ==============================================================================
// STORED SETTINGS (profile `settings` column, camelCase as written by the portal)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkHours {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkSchedule {
    #[serde(default)]
    pub unit_id: Option<String>,
    pub unit_name: String,
    pub work_days: Vec<u8>,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalSettings {
    #[serde(default)]
    pub work_days: Vec<u8>,
    #[serde(default)]
    pub work_hours: Option<WorkHours>,
    #[serde(default)]
    pub lunch_start: Option<String>,
    #[serde(default)]
    pub lunch_end: Option<String>,
    #[serde(default)]
    pub work_schedules: Vec<WorkSchedule>,
    #[serde(default)]
    pub blocked_days: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub blocked_time_slots: BTreeMap<NaiveDate, BTreeSet<String>>,
}

/// Single-unit schedule kept for professionals configured before multi-unit support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySchedule {
    pub unit_name: String,
    pub work_days: Vec<u8>,
    pub work_hours: WorkHours,
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Legacy(LegacySchedule),
    MultiUnit(Vec<WorkSchedule>),
    Unconfigured,
}

impl ProfessionalSettings {
    /// Multi-unit entries win whenever at least one exists, even if none covers a given day.
    pub fn schedule(&self, implied_unit: &str) -> Schedule {
        if !self.work_schedules.is_empty() {
            return Schedule::MultiUnit(self.work_schedules.clone());
        }

        match &self.work_hours {
            Some(hours) => Schedule::Legacy(LegacySchedule {
                unit_name: implied_unit.to_string(),
                work_days: self.work_days.clone(),
                work_hours: hours.clone(),
                lunch_start: self.lunch_start.clone(),
                lunch_end: self.lunch_end.clone(),
            }),
            None => Schedule::Unconfigured,
        }
    }

    pub fn blocked_times_on(&self, date: NaiveDate) -> BTreeSet<String> {
        self.blocked_time_slots.get(&date).cloned().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        for schedule in &self.work_schedules {
            schedule.validate()?;
        }

        if let Some(hours) = &self.work_hours {
            validate_days(&self.work_days)?;
            validate_range(&hours.start, &hours.end)?;
            if let (Some(start), Some(end)) = (&self.lunch_start, &self.lunch_end) {
                validate_range(start, end)?;
            }
        }

        for times in self.blocked_time_slots.values() {
            for time in times {
                if !is_on_slot_grid(time) {
                    return Err(ScheduleError::Validation(format!(
                        "Blocked slot '{}' is not a HH:MM half-hour boundary", time
                    )));
                }
            }
        }

        Ok(())
    }
}

impl WorkSchedule {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.unit_name.trim().is_empty() {
            return Err(ScheduleError::Validation("Work schedule needs a unit name".to_string()));
        }
        validate_days(&self.work_days)?;
        validate_range(&self.start, &self.end)
    }
}

fn validate_days(days: &[u8]) -> Result<(), ScheduleError> {
    match days.iter().find(|d| **d > 6) {
        Some(day) => Err(ScheduleError::Validation(format!(
            "Day of week must be between 0 (Sunday) and 6 (Saturday), got {}", day
        ))),
        None => Ok(()),
    }
}

fn validate_range(start: &str, end: &str) -> Result<(), ScheduleError> {
    let (Some(start_time), Some(end_time)) = (parse_hhmm(start), parse_hhmm(end)) else {
        return Err(ScheduleError::Validation(format!("Invalid time range {}-{}", start, end)));
    };
    if start_time > end_time {
        return Err(ScheduleError::Validation("Start time must not be after end time".to_string()));
    }
    if let Some(off_grid) = [start, end].into_iter().find(|t| !is_on_slot_grid(t)) {
        return Err(ScheduleError::Validation(format!(
            "'{}' is not a HH:MM half-hour boundary", off_grid.trim()
        )));
    }
    Ok(())
}

/// Rows saved before grid validation may start mid-slot; they open at the next boundary.
fn grid_start(unit_name: &str, start: u32) -> u32 {
    let aligned = next_slot_boundary(start);
    if aligned != start {
        warn!("Schedule for {} starts off the half-hour grid; first slot moved to minute {}",
              unit_name, aligned);
    }
    aligned
}

// ==============================================================================
// NORMALIZED SCHEDULE (what the slot generator consumes)
// ==============================================================================

/// Lunch window applied to every multi-unit schedule, in minutes of the day.
pub const FIXED_LUNCH_START: u32 = 12 * 60;
pub const FIXED_LUNCH_END: u32 = 13 * 60;

/// Times are minutes since midnight; `end` and `lunch_end` are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchedule {
    pub unit_id: Option<String>,
    pub unit_name: String,
    pub work_days: Vec<u8>,
    pub start: u32,
    pub end: u32,
    pub lunch_start: u32,
    pub lunch_end: u32,
}

impl ResolvedSchedule {
    pub fn works_on(&self, day_of_week: u8) -> bool {
        self.work_days.contains(&day_of_week)
    }
}

impl Schedule {
    /// Flattens either variant into one uniform list. Entries with unparseable
    /// times are dropped; writes are validated so this only bites on legacy rows.
    pub fn resolve(&self) -> Vec<ResolvedSchedule> {
        match self {
            Schedule::Unconfigured => Vec::new(),
            Schedule::MultiUnit(entries) => {
                // Multi-unit schedules always use the fixed 12:00-13:00 lunch.
                entries
                    .iter()
                    .filter_map(|entry| match (parse_hhmm(&entry.start), parse_hhmm(&entry.end)) {
                        (Some(start), Some(end)) => Some(ResolvedSchedule {
                            unit_id: entry.unit_id.clone(),
                            unit_name: entry.unit_name.clone(),
                            work_days: entry.work_days.clone(),
                            start: grid_start(&entry.unit_name, minutes_of_day(start)),
                            end: minutes_of_day(end),
                            lunch_start: FIXED_LUNCH_START,
                            lunch_end: FIXED_LUNCH_END,
                        }),
                        _ => {
                            warn!("Skipping work schedule for unit {} with invalid hours {}-{}",
                                  entry.unit_name, entry.start, entry.end);
                            None
                        }
                    })
                    .collect()
            }
            Schedule::Legacy(legacy) => {
                let (Some(start), Some(end)) = (
                    parse_hhmm(&legacy.work_hours.start),
                    parse_hhmm(&legacy.work_hours.end),
                ) else {
                    warn!("Skipping legacy schedule with invalid hours {:?}", legacy.work_hours);
                    return Vec::new();
                };

                let lunch_start = legacy.lunch_start.as_deref().and_then(parse_hhmm)
                    .map(minutes_of_day)
                    .unwrap_or(FIXED_LUNCH_START);
                let lunch_end = legacy.lunch_end.as_deref().and_then(parse_hhmm)
                    .map(minutes_of_day)
                    .unwrap_or(FIXED_LUNCH_END);

                vec![ResolvedSchedule {
                    unit_id: None,
                    unit_name: legacy.unit_name.clone(),
                    work_days: legacy.work_days.clone(),
                    start: grid_start(&legacy.unit_name, minutes_of_day(start)),
                    end: minutes_of_day(end),
                    lunch_start,
                    lunch_end,
                }]
            }
        }
    }
}

/// Everything the slot generator needs about one professional, resolved once per read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Availability {
    pub schedules: Vec<ResolvedSchedule>,
    pub blocked_days: BTreeSet<NaiveDate>,
}

impl Availability {
    pub fn from_settings(settings: &ProfessionalSettings, implied_unit: &str) -> Self {
        Self {
            schedules: settings.schedule(implied_unit).resolve(),
            blocked_days: settings.blocked_days.clone(),
        }
    }
}

// ==============================================================================
// DERIVED / API MODELS
// ==============================================================================

/// An offerable slot. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: String,
    pub unit_name: String,
    #[serde(default)]
    pub unit_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub health_unit: Option<String>,
    #[serde(default)]
    pub settings: Option<ProfessionalSettings>,
}

impl ProfessionalProfile {
    pub fn implied_unit(&self) -> &str {
        self.health_unit.as_deref().unwrap_or(DEFAULT_UNIT_NAME)
    }

    pub fn settings_or_default(&self) -> ProfessionalSettings {
        self.settings.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingDaysQuery {
    pub from: NaiveDate,
    pub days: Option<u32>,
}

pub fn normalize_times<'a, I>(times: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    times.into_iter().filter_map(|t| normalize_time(t)).collect()
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ScheduleError {
    #[error("Professional not found")]
    ProfessionalNotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ScheduleError {
    pub fn user_message(&self) -> String {
        match self {
            ScheduleError::ProfessionalNotFound => "Profissional não encontrado.".to_string(),
            ScheduleError::Validation(detail) => format!("Dados de agenda inválidos: {}", detail),
            ScheduleError::Database(_) => {
                "Não foi possível concluir a operação. Tente novamente.".to_string()
            }
        }
    }
}

impl From<ScheduleError> for shared_models::error::AppError {
    fn from(err: ScheduleError) -> Self {
        use shared_models::error::AppError;
        match &err {
            ScheduleError::ProfessionalNotFound => AppError::NotFound(err.user_message()),
            ScheduleError::Validation(_) => AppError::ValidationError(err.user_message()),
            ScheduleError::Database(detail) => {
                tracing::error!("Schedule persistence failure: {}", detail);
                AppError::Database(err.user_message())
            }
        }
    }
}
