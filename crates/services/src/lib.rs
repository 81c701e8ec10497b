#![forbid(unsafe_code)]

pub mod account_service;
pub mod admin_service;
pub mod app_services;
pub mod assessment;
pub mod catalog_service;
pub mod community_service;
pub mod config;
pub mod error;
pub mod stats_service;

pub use patente_core::Clock;

pub use account_service::AccountService;
pub use admin_service::{AdminService, Dashboard};
pub use app_services::AppServices;
pub use assessment::{
    ActiveSession, AssessmentService, ExamTimer, ProgressRecorder, QuestionView, SessionSnapshot,
};
pub use catalog_service::{CatalogService, CategoryOverview};
pub use community_service::{CommunityService, FeedItem, LikeToggle};
pub use config::{AppConfig, AssessmentConfig, ConfigError};
pub use error::{
    AccountError, AdminServiceError, AppServicesError, AssessmentError, CatalogServiceError,
    CommunityServiceError, StatsServiceError,
};
pub use stats_service::{StatsService, StudyAdvice, UserStats};
