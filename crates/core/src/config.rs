//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables;
//! binaries call the `*_from_env_value` helpers and build a [`CoreConfig`].

use crate::constants::{
    DEFAULT_APPOINTMENT_MINUTES, DEFAULT_CLOSES_AT, DEFAULT_DATABASE_URL, DEFAULT_OPENS_AT,
    DEFAULT_WORKING_DAYS, MAX_APPOINTMENT_MINUTES, MAX_PAGE_SIZE, MIN_APPOINTMENT_MINUTES,
};
use crate::{ClinicError, ClinicResult};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Opening hours of the clinic, in clinic-local time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClinicHours {
    opens_at: NaiveTime,
    closes_at: NaiveTime,
    working_days: Vec<Weekday>,
}

impl ClinicHours {
    pub fn new(
        opens_at: NaiveTime,
        closes_at: NaiveTime,
        working_days: Vec<Weekday>,
    ) -> ClinicResult<Self> {
        if opens_at >= closes_at {
            return Err(ClinicError::invalid(
                "clinic opening time must be before closing time",
            ));
        }
        if working_days.is_empty() {
            return Err(ClinicError::invalid("clinic must have at least one working day"));
        }

        let mut working_days = working_days;
        working_days.sort_by_key(|d| d.num_days_from_monday());
        working_days.dedup();

        Ok(Self {
            opens_at,
            closes_at,
            working_days,
        })
    }

    pub fn opens_at(&self) -> NaiveTime {
        self.opens_at
    }

    pub fn closes_at(&self) -> NaiveTime {
        self.closes_at
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    /// Opening and closing instants for `date`, or `None` when the clinic is closed that day.
    pub fn day_bounds(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.is_working_day(date)
            .then(|| (date.and_time(self.opens_at), date.and_time(self.closes_at)))
    }

    /// Whether the half-open interval `[start, end)` lies inside a single working day's hours.
    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if end <= start || start.date() != end.date() {
            // A slot ending exactly at midnight is never inside opening hours either.
            return false;
        }
        match self.day_bounds(start.date()) {
            Some((open, close)) => start >= open && end <= close,
            None => false,
        }
    }
}

impl Default for ClinicHours {
    fn default() -> Self {
        Self {
            opens_at: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            closes_at: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_url: String,
    clinic_hours: ClinicHours,
    appointment_minutes: u32,
    max_page_size: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        database_url: String,
        clinic_hours: ClinicHours,
        appointment_minutes: u32,
    ) -> ClinicResult<Self> {
        if database_url.trim().is_empty() {
            return Err(ClinicError::invalid("database_url cannot be empty"));
        }
        if !(MIN_APPOINTMENT_MINUTES..=MAX_APPOINTMENT_MINUTES).contains(&appointment_minutes) {
            return Err(ClinicError::invalid(format!(
                "appointment length must be between {MIN_APPOINTMENT_MINUTES} and {MAX_APPOINTMENT_MINUTES} minutes"
            )));
        }

        Ok(Self {
            database_url,
            clinic_hours,
            appointment_minutes,
            max_page_size: MAX_PAGE_SIZE,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn clinic_hours(&self) -> &ClinicHours {
        &self.clinic_hours
    }

    pub fn appointment_minutes(&self) -> u32 {
        self.appointment_minutes
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }
}

/// The clinic wall clock. Appointment times and calendar dates (birth dates, booking days) are
/// clinic-local; audit and record timestamps stay in UTC.
pub fn clinic_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn clinic_today() -> NaiveDate {
    clinic_now().date()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the database URL, falling back to a local SQLite file.
pub fn database_url_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_DATABASE_URL.into())
}

/// Parse a `HH:MM` clinic time, using `default` when the value is missing or blank.
pub fn clinic_time_from_env_value(value: Option<String>, default: &str) -> ClinicResult<NaiveTime> {
    let raw = non_blank(value).unwrap_or_else(|| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .map_err(|_| ClinicError::invalid(format!("invalid clinic time '{raw}', expected HH:MM")))
}

/// Parse a comma separated list of weekdays (`mon,tue,...` or full names).
pub fn working_days_from_env_value(value: Option<String>) -> ClinicResult<Vec<Weekday>> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_WORKING_DAYS.into());
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse::<Weekday>()
                .map_err(|_| ClinicError::invalid(format!("invalid weekday '{d}'")))
        })
        .collect()
}

/// Parse the default appointment length in minutes.
pub fn appointment_minutes_from_env_value(value: Option<String>) -> ClinicResult<u32> {
    match non_blank(value) {
        None => Ok(DEFAULT_APPOINTMENT_MINUTES),
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| ClinicError::invalid(format!("invalid appointment length '{v}'"))),
    }
}

/// Build [`ClinicHours`] from the three optional environment values.
pub fn clinic_hours_from_env_values(
    opens_at: Option<String>,
    closes_at: Option<String>,
    working_days: Option<String>,
) -> ClinicResult<ClinicHours> {
    ClinicHours::new(
        clinic_time_from_env_value(opens_at, DEFAULT_OPENS_AT)?,
        clinic_time_from_env_value(closes_at, DEFAULT_CLOSES_AT)?,
        working_days_from_env_value(working_days)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn defaults_apply_to_missing_values() {
        let hours = clinic_hours_from_env_values(None, Some("  ".into()), None).unwrap();
        assert_eq!(hours, ClinicHours::default());
        assert_eq!(database_url_from_env_value(None), DEFAULT_DATABASE_URL);
        assert_eq!(appointment_minutes_from_env_value(None).unwrap(), 30);
    }

    #[test]
    fn rejects_inverted_hours() {
        let err = clinic_hours_from_env_values(Some("18:00".into()), Some("08:00".into()), None)
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn parses_weekday_names() {
        let days = working_days_from_env_value(Some("Mon, saturday".into())).unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Sat]);
        assert!(working_days_from_env_value(Some("mon,funday".into())).is_err());
    }

    #[test]
    fn contains_respects_hours_and_days() {
        let hours = ClinicHours::default();
        // 2099-06-01 is a Monday, 2099-06-06 a Saturday.
        assert!(hours.contains(at("2099-06-01", "08:00"), at("2099-06-01", "08:30")));
        assert!(hours.contains(at("2099-06-01", "17:30"), at("2099-06-01", "18:00")));
        assert!(!hours.contains(at("2099-06-01", "07:45"), at("2099-06-01", "08:15")));
        assert!(!hours.contains(at("2099-06-01", "17:45"), at("2099-06-01", "18:15")));
        assert!(!hours.contains(at("2099-06-06", "10:00"), at("2099-06-06", "10:30")));
    }

    #[test]
    fn config_rejects_out_of_range_length() {
        let err = CoreConfig::new("sqlite::memory:".into(), ClinicHours::default(), 5).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}
