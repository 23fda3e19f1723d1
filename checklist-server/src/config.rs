use std::time::Duration;

use clap::Parser;

pub const STORE_URL_VAR: &str = "CHECKLIST_STORE_URL";
pub const STORE_KEY_VAR: &str = "CHECKLIST_STORE_KEY";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Parser, Debug)]
#[command(name = "checklist-server", about = "Task checklist web service")]
pub struct ServerArgs {
    /// Address to listen on (falls back to BIND_ADDRESS, then 0.0.0.0:8080)
    #[arg(long)]
    pub bind: Option<String>,

    /// Log filter directives, overriding RUST_LOG
    #[arg(long)]
    pub log: Option<String>,

    /// Seconds a session may go unused before it is dropped
    #[arg(long, default_value_t = DEFAULT_SESSION_IDLE_SECS)]
    pub session_idle_secs: u64,
}

impl ServerArgs {
    pub fn bind_address(&self) -> String {
        self.bind
            .clone()
            .or_else(|| std::env::var("BIND_ADDRESS").ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

/// Connection parameters for the hosted store.
#[derive(Clone, PartialEq)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
}

impl StoreConfig {
    /// Both variables must be present and non-empty; otherwise the store is
    /// not configured and the checklist runs on its built-in data.
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            std::env::var(STORE_URL_VAR).ok(),
            std::env::var(STORE_KEY_VAR).ok(),
        )
    }

    pub fn from_values(url: Option<String>, api_key: Option<String>) -> Option<Self> {
        let url = url.filter(|value| !value.trim().is_empty())?;
        let api_key = api_key.filter(|value| !value.trim().is_empty())?;
        Some(Self {
            url: url.trim().to_string(),
            api_key,
        })
    }

    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_values_required() {
        assert!(StoreConfig::from_values(None, None).is_none());
        assert!(StoreConfig::from_values(Some("postgres://db".into()), None).is_none());
        assert!(StoreConfig::from_values(None, Some("key".into())).is_none());
        assert!(StoreConfig::from_values(Some("  ".into()), Some("key".into())).is_none());

        let config = StoreConfig::from_values(Some("postgres://db".into()), Some("key".into())).unwrap();
        assert_eq!(config.url, "postgres://db");
        assert!(!config.is_memory());
    }

    #[test]
    fn test_debug_hides_key() {
        let config = StoreConfig::from_values(Some("memory:".into()), Some("secret-key".into())).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-key"));
        assert!(config.is_memory());
    }

    #[test]
    fn test_bind_flag_wins() {
        let args = ServerArgs::parse_from(["checklist-server", "--bind", "127.0.0.1:9000"]);
        assert_eq!(args.bind_address(), "127.0.0.1:9000");
        assert_eq!(args.session_idle(), Duration::from_secs(DEFAULT_SESSION_IDLE_SECS));

        let args = ServerArgs::parse_from(["checklist-server", "--session-idle-secs", "90"]);
        assert_eq!(args.session_idle(), Duration::from_secs(90));
    }
}
