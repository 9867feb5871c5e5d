//! Runtime configuration resolved from the environment.
//!
//! Resolution order for every setting is: environment variable, then the
//! platform default (home directory via `dirs`).

use std::path::PathBuf;
use std::time::Duration;

/// Overrides the executable used to start the app-server.
pub const CODEX_BIN_ENV: &str = "CCSTATS_CODEX_BIN";
/// Directory holding Codex state (`auth.json`).
pub const CODEX_HOME_ENV: &str = "CODEX_HOME";
/// API key authentication for Codex.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Disables ANSI colour when set to any non-empty value.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Timeout for the `initialize` handshake request.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(3);
/// Timeout for each request after the handshake.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

const DEFAULT_CODEX_BIN: &str = "codex";

/// How to start and talk to the app-server process.
#[derive(Debug, Clone)]
pub struct AppServerConfig {
    /// Executable, resolved on `PATH`.
    pub program: String,
    /// Arguments; `["app-server"]` for the real Codex CLI.
    pub args: Vec<String>,
    /// Sent as `clientInfo.name` during the handshake.
    pub client_name: String,
    /// Sent as `clientInfo.version` during the handshake.
    pub client_version: String,
    pub init_timeout: Duration,
    pub request_timeout: Duration,
}

impl AppServerConfig {
    /// Configuration for `<program> app-server` with default timeouts.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["app-server".to_string()],
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            init_timeout: DEFAULT_INIT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replace the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for AppServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CODEX_BIN)
    }
}

/// Settings for one `ccstats` run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_server: AppServerConfig,
    /// Path to Codex `auth.json`, if a home directory could be found.
    pub codex_auth_path: Option<PathBuf>,
    /// Value of `OPENAI_API_KEY`, trimmed; `None` when unset or blank.
    pub openai_api_key: Option<String>,
    /// Whether colour output is allowed at all (terminal detection is separate).
    pub color: bool,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::home_dir())
    }

    /// Resolve settings from an arbitrary variable lookup and home directory.
    pub fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let program = non_empty(CODEX_BIN_ENV).unwrap_or_else(|| DEFAULT_CODEX_BIN.to_string());

        let codex_home = non_empty(CODEX_HOME_ENV)
            .map(PathBuf::from)
            .or_else(|| home.map(|h| h.join(".codex")));

        Self {
            app_server: AppServerConfig::new(program),
            codex_auth_path: codex_home.map(|dir| dir.join("auth.json")),
            openai_api_key: non_empty(OPENAI_API_KEY_ENV),
            color: non_empty(NO_COLOR_ENV).is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[]), Some(PathBuf::from("/home/user")));
        assert_eq!(settings.app_server.program, "codex");
        assert_eq!(settings.app_server.args, vec!["app-server"]);
        assert_eq!(settings.app_server.init_timeout, Duration::from_secs(3));
        assert_eq!(settings.app_server.request_timeout, Duration::from_secs(4));
        assert_eq!(
            settings.codex_auth_path,
            Some(PathBuf::from("/home/user/.codex/auth.json"))
        );
        assert_eq!(settings.openai_api_key, None);
        assert!(settings.color);
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::from_lookup(
            lookup(&[
                ("CCSTATS_CODEX_BIN", "/opt/codex/bin/codex"),
                ("CODEX_HOME", "/tmp/codex-home"),
                ("OPENAI_API_KEY", "  sk-test  "),
                ("NO_COLOR", "1"),
            ]),
            Some(PathBuf::from("/home/user")),
        );
        assert_eq!(settings.app_server.program, "/opt/codex/bin/codex");
        assert_eq!(
            settings.codex_auth_path,
            Some(PathBuf::from("/tmp/codex-home/auth.json"))
        );
        assert_eq!(settings.openai_api_key.as_deref(), Some("sk-test"));
        assert!(!settings.color);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let settings = Settings::from_lookup(
            lookup(&[("OPENAI_API_KEY", "   "), ("CCSTATS_CODEX_BIN", "")]),
            None,
        );
        assert_eq!(settings.openai_api_key, None);
        assert_eq!(settings.app_server.program, "codex");
        assert_eq!(settings.codex_auth_path, None);
    }

    #[test]
    fn test_app_server_config_builders() {
        let config = AppServerConfig::new("sh")
            .with_args(["-c", "cat"])
            .with_request_timeout(Duration::from_millis(250));
        assert_eq!(config.args, vec!["-c", "cat"]);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.client_name, "ccstats");
    }
}
