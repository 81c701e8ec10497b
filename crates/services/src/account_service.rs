use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use patente_core::Clock;
use patente_core::model::{
    Email, PasswordDigest, Role, User, UserError, UserId, check_password,
};
use storage::repository::{StorageError, UserRepository};

use crate::error::AccountError;

/// Registration, login and profile management.
///
/// Passwords are stored as a salted SHA-256 digest. This keeps plain text out
/// of storage; it is not meant to resist offline attacks.
#[derive(Clone)]
pub struct AccountService {
    clock: Clock,
    admin_email: String,
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        clock: Clock,
        admin_email: impl Into<String>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            clock,
            admin_email: admin_email.into().trim().to_lowercase(),
            users,
        }
    }

    /// Create an account. The configured admin address gets the admin role.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::User` for missing fields, a short password or a
    /// malformed email, and `EmailTaken` if the address is registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AccountError> {
        if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
            return Err(UserError::MissingFields.into());
        }
        check_password(password)?;
        let email = Email::parse(email)?;
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let role = if email.as_str() == self.admin_email {
            Role::Admin
        } else {
            Role::User
        };
        let now = self.clock.now();
        let mut user = User::new(
            UserId::new_v4(),
            email,
            name,
            role,
            hash_password(password),
            now,
        );
        user.last_login = Some(now);
        user.touch_streak(self.clock.today());

        match self.users.insert_user(&user).await {
            Err(StorageError::Conflict) => return Err(AccountError::EmailTaken),
            other => other?,
        }
        info!(user_id = %user.id, role = user.role.as_str(), "account registered");
        Ok(user)
    }

    /// Check credentials and stamp the login.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` for an unknown email or a
    /// wrong password, and `Banned` for a banned account.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AccountError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(UserError::MissingFields.into());
        }
        let Ok(email) = Email::parse(email) else {
            return Err(AccountError::InvalidCredentials);
        };
        let Some(mut user) = self.users.find_user_by_email(&email).await? else {
            return Err(AccountError::InvalidCredentials);
        };
        if user.banned {
            return Err(AccountError::Banned);
        }
        if !verify_password(password, &user.password) {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        let now = self.clock.now();
        user.last_login = Some(now);
        user.touch_streak(self.clock.today());
        user.updated_at = now;
        self.users.update_user(&user).await?;
        info!(user_id = %user.id, streak = user.streak, "login");
        Ok(user)
    }

    /// Count today towards the daily streak of a returning user.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the user cannot be loaded or saved.
    pub async fn record_activity(&self, id: UserId) -> Result<User, AccountError> {
        let mut user = self.users.get_user(id).await?;
        if user.touch_streak(self.clock.today()) {
            user.updated_at = self.clock.now();
            self.users.update_user(&user).await?;
        }
        Ok(user)
    }

    /// Change the display name and/or the password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::User` for a blank name or a short password.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AccountError> {
        let mut user = self.users.get_user(id).await?;
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(UserError::MissingFields.into());
            }
            name.clone_into(&mut user.name);
        }
        if let Some(password) = password {
            check_password(password)?;
            user.password = hash_password(password);
        }
        user.updated_at = self.clock.now();
        self.users.update_user(&user).await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AccountError::Storage` with `NotFound` for an unknown id.
    pub async fn user(&self, id: UserId) -> Result<User, AccountError> {
        Ok(self.users.get_user(id).await?)
    }
}

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Encode as `salt$digest`, both lowercase hex.
fn hash_password(password: &str) -> PasswordDigest {
    let salt = format!("{:032x}", rand::random::<u128>());
    let digest = digest_hex(&salt, password);
    PasswordDigest::new(format!("{salt}${digest}"))
}

fn verify_password(password: &str, stored: &PasswordDigest) -> bool {
    stored
        .as_str()
        .split_once('$')
        .is_some_and(|(salt, digest)| digest_hex(salt, password) == digest)
}
