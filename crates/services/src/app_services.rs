use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::account_service::AccountService;
use crate::admin_service::AdminService;
use crate::assessment::AssessmentService;
use crate::catalog_service::CatalogService;
use crate::community_service::CommunityService;
use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::stats_service::StatsService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    config: AppConfig,
    assessment: Arc<AssessmentService>,
    catalog: Arc<CatalogService>,
    accounts: Arc<AccountService>,
    stats: Arc<StatsService>,
    community: Arc<CommunityService>,
    admin: Arc<AdminService>,
}

impl AppServices {
    /// Build services backed by `SQLite` at `config.database_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        Ok(Self::with_storage(config, clock, &storage))
    }

    /// Read `PATENTE_*` variables, then open `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` for invalid variables, or a storage error.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        let config = AppConfig::from_env()?;
        Self::new_sqlite(config, clock).await
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: AppConfig, clock: Clock) -> Self {
        Self::with_storage(config, clock, &Storage::in_memory())
    }

    #[must_use]
    pub fn with_storage(config: AppConfig, clock: Clock, storage: &Storage) -> Self {
        let assessment = Arc::new(AssessmentService::new(
            clock,
            config.assessment,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        ));
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
        ));
        let accounts = Arc::new(AccountService::new(
            clock,
            config.admin_email.clone(),
            Arc::clone(&storage.users),
        ));
        let stats = Arc::new(StatsService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
        ));
        let community = Arc::new(CommunityService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.community),
        ));
        let admin = Arc::new(AdminService::new(clock, storage));

        Self {
            config,
            assessment,
            catalog,
            accounts,
            stats,
            community,
            admin,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn assessment(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessment)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn accounts(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn community(&self) -> Arc<CommunityService> {
        Arc::clone(&self.community)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }
}
