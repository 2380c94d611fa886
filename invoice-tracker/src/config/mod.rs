//! Configuration module for invoice-tracker.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

use crate::services::totals::DEFAULT_TAX_RATE;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// `None` runs the service on the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub billing: BillingConfig,
    pub reminders: ReminderConfig,
    /// `None` when the `EMAIL_*` variables are incomplete.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub tax_rate: Decimal,
    pub business_name: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            business_name: "Your Business".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Local time of day for the due-soon check.
    pub due_soon_time: NaiveTime,
    /// Local time of day for the overdue check.
    pub overdue_time: NaiveTime,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            due_soon_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            overdue_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let reminder_defaults = ReminderConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "invoice-tracker".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: non_empty("DATABASE_URL").map(|url| DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            }),
            billing: BillingConfig {
                tax_rate: match non_empty("TAX_RATE") {
                    Some(raw) => parse_tax_rate(&raw)?,
                    None => DEFAULT_TAX_RATE,
                },
                business_name: env::var("BUSINESS_NAME")
                    .unwrap_or_else(|_| BillingConfig::default().business_name),
            },
            reminders: ReminderConfig {
                enabled: env::var("REMINDERS_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
                due_soon_time: match non_empty("REMINDER_DUE_SOON_TIME") {
                    Some(raw) => parse_time_of_day("REMINDER_DUE_SOON_TIME", &raw)?,
                    None => reminder_defaults.due_soon_time,
                },
                overdue_time: match non_empty("REMINDER_OVERDUE_TIME") {
                    Some(raw) => parse_time_of_day("REMINDER_OVERDUE_TIME", &raw)?,
                    None => reminder_defaults.overdue_time,
                },
            },
            smtp: smtp_from_env(),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// SMTP is configured only when host, user and password are all present.
fn smtp_from_env() -> Option<SmtpConfig> {
    let host = non_empty("EMAIL_HOST")?;
    let user = non_empty("EMAIL_USER")?;
    let password = non_empty("EMAIL_PASS")?;

    Some(SmtpConfig {
        host,
        port: env::var("EMAIL_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587),
        from_email: non_empty("EMAIL_FROM").unwrap_or_else(|| user.clone()),
        from_name: non_empty("EMAIL_FROM_NAME").unwrap_or_else(|| "Invoice Tracker".to_string()),
        user,
        password,
    })
}

fn parse_tax_rate(raw: &str) -> Result<Decimal, AppError> {
    let rate = Decimal::from_str(raw.trim()).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("TAX_RATE '{}' is not a decimal: {}", raw, e))
    })?;
    if rate.is_sign_negative() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "TAX_RATE must not be negative"
        )));
    }
    Ok(rate)
}

fn parse_time_of_day(key: &str, raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} '{}' is not HH:MM: {}", key, raw, e))
    })
}
