//! Runtime configuration read from the environment.

use chrono::Duration;
use patente_core::assessment::ModePolicy;
use thiserror::Error;

pub const DEFAULT_DB_URL: &str = "sqlite://patente.sqlite3";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@patente.com";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} is out of range: {value}")]
    OutOfRange { key: &'static str, value: String },
}

/// Tunables of the three assessment modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentConfig {
    pub exam_questions: usize,
    pub exam_duration: Duration,
    /// Errors tolerated before an exam counts as failed.
    pub exam_allowed_errors: u32,
    pub practice_questions: usize,
    /// Minimum correct share, in percent, to pass a lesson quiz.
    pub lesson_pass_percent: u8,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            exam_questions: 30,
            exam_duration: Duration::minutes(30),
            exam_allowed_errors: 3,
            practice_questions: 10,
            lesson_pass_percent: 70,
        }
    }
}

impl AssessmentConfig {
    #[must_use]
    pub fn practice_policy(&self) -> ModePolicy {
        ModePolicy::practice()
    }

    #[must_use]
    pub fn lesson_quiz_policy(&self) -> ModePolicy {
        ModePolicy::lesson_quiz(self.lesson_pass_percent)
    }

    #[must_use]
    pub fn exam_policy(&self) -> ModePolicy {
        ModePolicy::exam(self.exam_allowed_errors, self.exam_duration)
    }
}

/// Top-level configuration for assembling `AppServices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    /// Registering with this address yields an admin account.
    pub admin_email: String,
    pub assessment: AssessmentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.into(),
            admin_email: DEFAULT_ADMIN_EMAIL.into(),
            assessment: AssessmentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from `PATENTE_*` environment variables.
    ///
    /// Missing variables fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparsable or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is unparsable or out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AssessmentConfig::default();

        let database_url = lookup("PATENTE_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.to_owned(), normalize_sqlite_url);
        let admin_email = lookup("PATENTE_ADMIN_EMAIL")
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_owned());

        let exam_questions: usize =
            parse_or(&lookup, "PATENTE_EXAM_QUESTIONS", defaults.exam_questions)?;
        let exam_minutes: i64 = parse_or(
            &lookup,
            "PATENTE_EXAM_MINUTES",
            defaults.exam_duration.num_minutes(),
        )?;
        let exam_allowed_errors: u32 = parse_or(
            &lookup,
            "PATENTE_EXAM_ALLOWED_ERRORS",
            defaults.exam_allowed_errors,
        )?;
        let practice_questions: usize =
            parse_or(&lookup, "PATENTE_PRACTICE_QUESTIONS", defaults.practice_questions)?;
        let lesson_pass_percent: u8 = parse_or(
            &lookup,
            "PATENTE_LESSON_PASS_PERCENT",
            defaults.lesson_pass_percent,
        )?;

        if exam_questions == 0 {
            return Err(out_of_range("PATENTE_EXAM_QUESTIONS", exam_questions));
        }
        if exam_minutes <= 0 {
            return Err(out_of_range("PATENTE_EXAM_MINUTES", exam_minutes));
        }
        if practice_questions == 0 {
            return Err(out_of_range("PATENTE_PRACTICE_QUESTIONS", practice_questions));
        }
        if lesson_pass_percent > 100 {
            return Err(out_of_range("PATENTE_LESSON_PASS_PERCENT", lesson_pass_percent));
        }

        Ok(Self {
            database_url,
            admin_email,
            assessment: AssessmentConfig {
                exam_questions,
                exam_duration: Duration::minutes(exam_minutes),
                exam_allowed_errors,
                practice_questions,
                lesson_pass_percent,
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn out_of_range(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::OutOfRange {
        key,
        value: value.to_string(),
    }
}

/// Turn a bare path (or `sqlite:` path) into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.starts_with("sqlite:file:")
    {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}?mode=rwc", absolute.display())
}
