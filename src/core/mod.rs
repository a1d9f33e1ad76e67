//! Credential lifecycle, quota polling, alerting and the polling loop.

pub mod alert;
pub mod credentials;
pub mod http;
pub mod logging;
pub mod models;
pub mod oauth;
pub mod policy;
pub mod quota;
pub mod scheduler;

pub use alert::{AlertSink, TelegramDispatcher, format_alert};
pub use credentials::{
    Authorization, AuthorizedClient, CodePrompt, ConsolePrompt, CredentialManager,
    PendingAuthorization, obtain_authenticated_transport,
};
pub use models::QuotaSnapshot;
pub use oauth::{DRIVE_READONLY_SCOPE, OAuthClient};
pub use policy::AlertPolicy;
pub use quota::{DriveQuotaPoller, QuotaSource};
pub use scheduler::{RunStats, Scheduler, TickOutcome, status_line};
