use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

/// Shortest password accepted at registration or profile update.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("email, password and name are required")]
    MissingFields,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,

    #[error("invalid role: {0}")]
    InvalidRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// # Errors
    ///
    /// Returns `UserError::InvalidRole` for unknown values.
    pub fn parse(s: &str) -> Result<Self, UserError> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UserError::InvalidRole(other.to_owned())),
        }
    }
}

/// Lowercased, shape-checked email address (`local@domain.tld`, no whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// # Errors
    ///
    /// Returns `UserError::InvalidEmail` if the address does not look like
    /// `local@domain.tld`.
    pub fn parse(raw: &str) -> Result<Self, UserError> {
        let email = raw.trim().to_lowercase();
        if email.chars().any(char::is_whitespace) {
            return Err(UserError::InvalidEmail);
        }
        let Some((local, domain)) = email.split_once('@') else {
            return Err(UserError::InvalidEmail);
        };
        if local.is_empty() || domain.contains('@') {
            return Err(UserError::InvalidEmail);
        }
        let Some((host, tld)) = domain.rsplit_once('.') else {
            return Err(UserError::InvalidEmail);
        };
        if host.is_empty() || tld.is_empty() {
            return Err(UserError::InvalidEmail);
        }
        Ok(Self(email))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stored password digest. The core never interprets it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    #[must_use]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// Checks the registration rules on a plain-text password.
///
/// # Errors
///
/// Returns `UserError::PasswordTooShort` below `MIN_PASSWORD_LEN` characters.
pub fn check_password(password: &str) -> Result<(), UserError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserError::PasswordTooShort);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub banned: bool,
    pub streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub last_login: Option<DateTime<Utc>>,
    pub password: PasswordDigest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(
        id: UserId,
        email: Email,
        name: impl Into<String>,
        role: Role,
        password: PasswordDigest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            name: name.into().trim().to_owned(),
            role,
            banned: false,
            streak: 0,
            last_active_date: None,
            last_login: None,
            password,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Update the daily-activity streak for `today`.
    ///
    /// Returns `true` if anything changed. Same day leaves the streak alone,
    /// the following day extends it, any longer gap restarts it at 1.
    pub fn touch_streak(&mut self, today: NaiveDate) -> bool {
        match self.last_active_date {
            Some(last) if last == today => return false,
            Some(last) if last.succ_opt() == Some(today) => {
                self.streak = self.streak.saturating_add(1);
            }
            _ => self.streak = 1,
        }
        self.last_active_date = Some(today);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn user() -> User {
        User::new(
            UserId::new_v4(),
            Email::parse("student@example.com").unwrap(),
            " Sara ",
            Role::User,
            PasswordDigest::new("x"),
            fixed_now(),
        )
    }

    #[test]
    fn email_is_lowercased() {
        let email = Email::parse("  Admin@Patente.COM ").unwrap();
        assert_eq!(email.as_str(), "admin@patente.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["", "plain", "@x.it", "a@b", "a@.it", "a b@c.it", "a@b@c.it"] {
            assert_eq!(Email::parse(raw), Err(UserError::InvalidEmail), "{raw}");
        }
    }

    #[test]
    fn short_password_is_rejected() {
        assert_eq!(check_password("12345"), Err(UserError::PasswordTooShort));
        assert!(check_password("123456").is_ok());
    }

    #[test]
    fn name_is_trimmed() {
        assert_eq!(user().name, "Sara");
    }

    #[test]
    fn streak_starts_extends_and_resets() {
        let mut u = user();
        let day = fixed_now().date_naive();

        assert!(u.touch_streak(day));
        assert_eq!(u.streak, 1);

        assert!(!u.touch_streak(day));
        assert_eq!(u.streak, 1);

        let next = day.succ_opt().unwrap();
        assert!(u.touch_streak(next));
        assert_eq!(u.streak, 2);

        let gap = next + chrono::Duration::days(3);
        assert!(u.touch_streak(gap));
        assert_eq!(u.streak, 1);
    }

    #[test]
    fn digest_debug_is_redacted() {
        let digest = PasswordDigest::new("secret");
        assert_eq!(format!("{digest:?}"), "PasswordDigest(..)");
    }
}
