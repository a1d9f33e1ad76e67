//! Storage for configuration, client secrets, and the cached token.

pub mod client_secrets;
pub mod config;
pub mod paths;
pub mod token_store;

pub use client_secrets::ClientSecrets;
pub use config::{
    Config, ConfigOverrides, ConfigSource, ConfigSources, ENV_BOT_TOKEN, ENV_CHAT_ID,
    ENV_CLIENT_SECRETS, ENV_CONFIG, ENV_INTERVAL, ENV_THRESHOLD, ENV_TIMEOUT, ENV_TOKEN_FILE,
    ResolvedConfig, TelegramSettings,
};
pub use paths::AppPaths;
pub use token_store::{StoredToken, TokenStore};
