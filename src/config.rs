//! Runtime configuration for CareDesk.
//!
//! Everything is read from `CAREDESK_*` environment variables. Missing or
//! malformed values fall back to the defaults below.

use std::env;
use std::path::PathBuf;
use time::macros::{format_description, time};
use time::Time;

pub const APP_NAME: &str = "CareDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database path that selects the seeded in-memory database.
pub const MEMORY_DB: &str = ":memory:";

const DEFAULT_DB: &str = "caredesk.db";
const DEFAULT_LOG_FILTER: &str = "caredesk=info";
const DEFAULT_LOG_FILE: &str = "caredesk.log";
const DEFAULT_REPORTS_DIR: &str = "reports";
const DEFAULT_CURRENCY: &str = "$";
const DEFAULT_SLOT_MINUTES: u32 = 30;
const DEFAULT_DAY_START: Time = time!(09:00);
const DEFAULT_DAY_END: Time = time!(17:00);
const DEFAULT_INVOICE_DUE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: String,
    pub log_filter: String,
    pub log_file: PathBuf,
    pub reports_dir: PathBuf,
    pub currency: String,
    /// Granularity of bookable appointment slots.
    pub slot_minutes: u32,
    /// Working window used when a doctor has no schedule for a weekday.
    pub day_start: Time,
    pub day_end: Time,
    pub invoice_due_days: i64,
    /// Values that were rejected while reading the environment. They are
    /// logged by [`AppConfig::log_warnings`] once the subscriber exists.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DB.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            currency: DEFAULT_CURRENCY.to_string(),
            slot_minutes: DEFAULT_SLOT_MINUTES,
            day_start: DEFAULT_DAY_START,
            day_end: DEFAULT_DAY_END,
            invoice_due_days: DEFAULT_INVOICE_DUE_DAYS,
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(db) = lookup("CAREDESK_DB").filter(|v| !v.trim().is_empty()) {
            config.database = db;
        }
        if let Some(filter) = lookup("CAREDESK_LOG") {
            config.log_filter = filter;
        }
        if let Some(file) = lookup("CAREDESK_LOG_FILE") {
            config.log_file = PathBuf::from(file);
        }
        if let Some(dir) = lookup("CAREDESK_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }
        if let Some(currency) = lookup("CAREDESK_CURRENCY") {
            config.currency = currency;
        }
        if let Some(raw) = lookup("CAREDESK_SLOT_MINUTES") {
            match raw.parse::<u32>() {
                Ok(minutes) if (5..=240).contains(&minutes) => config.slot_minutes = minutes,
                _ => config
                    .warnings
                    .push(format!("Ignoring invalid CAREDESK_SLOT_MINUTES={raw}")),
            }
        }

        let start = lookup("CAREDESK_DAY_START").map(|raw| (parse_clock(&raw), raw));
        let end = lookup("CAREDESK_DAY_END").map(|raw| (parse_clock(&raw), raw));
        let day_start = match start {
            Some((Some(t), _)) => t,
            Some((None, raw)) => {
                config
                    .warnings
                    .push(format!("Ignoring invalid CAREDESK_DAY_START={raw}"));
                config.day_start
            }
            None => config.day_start,
        };
        let day_end = match end {
            Some((Some(t), _)) => t,
            Some((None, raw)) => {
                config
                    .warnings
                    .push(format!("Ignoring invalid CAREDESK_DAY_END={raw}"));
                config.day_end
            }
            None => config.day_end,
        };
        if day_start < day_end {
            config.day_start = day_start;
            config.day_end = day_end;
        } else {
            config
                .warnings
                .push("Working day must start before it ends, keeping defaults".to_string());
        }

        if let Some(raw) = lookup("CAREDESK_INVOICE_DUE_DAYS") {
            match raw.parse::<i64>() {
                Ok(days) if days >= 0 => config.invoice_due_days = days,
                _ => config
                    .warnings
                    .push(format!("Ignoring invalid CAREDESK_INVOICE_DUE_DAYS={raw}")),
            }
        }

        config
    }

    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{warning}");
        }
    }

    pub fn uses_memory_database(&self) -> bool {
        self.database == MEMORY_DB
    }
}

fn parse_clock(raw: &str) -> Option<Time> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.slot_minutes, 30);
        assert_eq!(config.day_start, time!(09:00));
        assert_eq!(config.day_end, time!(17:00));
        assert!(!config.uses_memory_database());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("CAREDESK_DB", ":memory:"),
            ("CAREDESK_SLOT_MINUTES", "15"),
            ("CAREDESK_DAY_START", "08:30"),
            ("CAREDESK_DAY_END", "12:00"),
            ("CAREDESK_CURRENCY", "€"),
        ]);
        assert!(config.uses_memory_database());
        assert_eq!(config.slot_minutes, 15);
        assert_eq!(config.day_start, time!(08:30));
        assert_eq!(config.day_end, time!(12:00));
        assert_eq!(config.currency, "€");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("CAREDESK_SLOT_MINUTES", "zero"),
            ("CAREDESK_DAY_START", "18:00"),
            ("CAREDESK_DAY_END", "07:00"),
            ("CAREDESK_INVOICE_DUE_DAYS", "-3"),
        ]);
        assert_eq!(config.slot_minutes, 30);
        assert_eq!(config.day_start, time!(09:00));
        assert_eq!(config.day_end, time!(17:00));
        assert_eq!(config.invoice_due_days, 30);
        assert_eq!(
            config.warnings,
            vec![
                "Ignoring invalid CAREDESK_SLOT_MINUTES=zero".to_string(),
                "Working day must start before it ends, keeping defaults".to_string(),
                "Ignoring invalid CAREDESK_INVOICE_DUE_DAYS=-3".to_string(),
            ]
        );
    }

    #[test]
    fn app_name_is_caredesk() {
        assert_eq!(APP_NAME, "CareDesk");
    }
}
