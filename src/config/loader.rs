//! `ApplicationConfig::load()`: env-first JSON grouping with legacy INI
//! fallback, mirroring the reference daemon's layered-`load()` convention
//! (env -> file -> built-in default, merged field-by-field).
//!
//! Priority per field: `RUNTIME_SETTINGS` JSON grouping > individual flat
//! env var > legacy INI file (`RUNTIME_CONFIG_INI_PATH`, section
//! `[runtime]`) > built-in default. Secrets never participate in this
//! chain: they are flat-only env vars, read directly.

use std::env;

use crate::config::ini;
use crate::config::schema::{ApplicationConfig, LogFormat, RuntimeSettings};
use crate::core::errors::ConfigError;

const ENV_RUNTIME_SETTINGS: &str = "RUNTIME_SETTINGS";
const ENV_BIND_ADDR: &str = "RUNTIME_BIND_ADDR";
const ENV_ORCHESTRATOR_URL: &str = "RUNTIME_ORCHESTRATOR_BASE_URL";
const ENV_LOG_FORMAT: &str = "RUNTIME_LOG_FORMAT";
const ENV_CACHE_MAX_SIZE: &str = "RUNTIME_CONFIG_CACHE_MAX_SIZE";
const ENV_COOKIE_TTL: &str = "WEB_ADMIN_COOKIE_TTL_SECONDS";
const ENV_INI_PATH: &str = "RUNTIME_CONFIG_INI_PATH";

const MIN_COOKIE_TTL: i64 = 60;
const MAX_COOKIE_TTL: i64 = 3600;

impl ApplicationConfig {
    /// Load and validate the process configuration. Fails closed: a missing
    /// required secret or an invalid value is a startup-fatal
    /// `ConfigError`, never a silently-degraded default.
    pub fn load() -> Result<Self, ConfigError> {
        let ini_doc = load_ini_fallback();
        let settings = resolve_runtime_settings(ini_doc.as_ref());

        let admin_cookie_ttl_seconds = settings.admin_cookie_ttl_seconds.clamp(MIN_COOKIE_TTL, MAX_COOKIE_TTL);

        let config = Self {
            bind_addr: settings.bind_addr,
            orchestrator_base_url: settings.orchestrator_base_url,
            log_format: settings.log_format,
            tenant_cache_max_size: settings.tenant_cache_max_size,
            admin_cookie_ttl_seconds,
            openai_api_key: required_var("OPENAI_API_KEY")?,
            openai_base_url: optional_var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_model: optional_var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_qps: optional_var("OPENAI_QPS").and_then(|v| v.parse().ok()).unwrap_or(2),
            dropbox_app_key: required_var("DROPBOX_APP_KEY")?,
            dropbox_app_secret: required_var("DROPBOX_APP_SECRET")?,
            dropbox_refresh_token: required_var("DROPBOX_REFRESH_TOKEN")?,
            web_session_secret: required_var("WEB_SESSION_SECRET")?,
            web_admin_password: optional_var("web_admin_pw"),
            auth0_client_secret: optional_var("AUTH0_CLIENT_SECRET"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation { field: "bind_addr".to_string(), detail: format!("not a socket address: {}", self.bind_addr) });
        }
        if self.orchestrator_base_url.is_empty() {
            return Err(ConfigError::Validation { field: "orchestrator_base_url".to_string(), detail: "must not be empty".to_string() });
        }
        if self.tenant_cache_max_size == 0 {
            return Err(ConfigError::Validation { field: "tenant_cache_max_size".to_string(), detail: "must be at least 1".to_string() });
        }
        Ok(())
    }
}

fn load_ini_fallback() -> Option<ini::IniDocument> {
    let path = env::var(ENV_INI_PATH).ok()?;
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            tracing::warn!(sections = "runtime", path, "config_deprecation");
            Some(ini::parse(&text))
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "config_deprecation_ini_unreadable");
            None
        }
    }
}

fn resolve_runtime_settings(ini_doc: Option<&ini::IniDocument>) -> RuntimeSettings {
    if let Ok(raw) = env::var(ENV_RUNTIME_SETTINGS) {
        if let Ok(settings) = serde_json::from_str::<RuntimeSettings>(&raw) {
            return settings;
        }
        tracing::warn!(var = ENV_RUNTIME_SETTINGS, "failed to parse RUNTIME_SETTINGS JSON grouping, falling back");
    }

    let default = RuntimeSettings::default();
    RuntimeSettings {
        bind_addr: layered_string(ENV_BIND_ADDR, ini_doc, "bind_addr", &default.bind_addr),
        orchestrator_base_url: layered_string(ENV_ORCHESTRATOR_URL, ini_doc, "orchestrator_base_url", &default.orchestrator_base_url),
        log_format: layered_log_format(ini_doc, default.log_format),
        tenant_cache_max_size: layered_usize(ENV_CACHE_MAX_SIZE, ini_doc, "tenant_cache_max_size", default.tenant_cache_max_size),
        admin_cookie_ttl_seconds: layered_i64(ENV_COOKIE_TTL, ini_doc, "admin_cookie_ttl_seconds", default.admin_cookie_ttl_seconds),
    }
}

fn layered_string(env_var: &str, ini_doc: Option<&ini::IniDocument>, ini_key: &str, default: &str) -> String {
    env::var(env_var).ok().or_else(|| ini_doc.and_then(|d| ini::get(d, "runtime", ini_key)).map(str::to_string)).unwrap_or_else(|| default.to_string())
}

fn layered_usize(env_var: &str, ini_doc: Option<&ini::IniDocument>, ini_key: &str, default: usize) -> usize {
    layered_string(env_var, ini_doc, ini_key, &default.to_string()).parse().unwrap_or(default)
}

fn layered_i64(env_var: &str, ini_doc: Option<&ini::IniDocument>, ini_key: &str, default: i64) -> i64 {
    layered_string(env_var, ini_doc, ini_key, &default.to_string()).parse().unwrap_or(default)
}

fn layered_log_format(ini_doc: Option<&ini::IniDocument>, default: LogFormat) -> LogFormat {
    let raw = layered_string(ENV_LOG_FORMAT, ini_doc, "log_format", if default == LogFormat::Pretty { "pretty" } else { "json" });
    match raw.as_str() {
        "pretty" => LogFormat::Pretty,
        _ => LogFormat::Json,
    }
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).ok().filter(|v| !v.is_empty()).ok_or_else(|| ConfigError::MissingVar { var: name.to_string() })
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var mutation races across tests in the same binary; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in [
            ENV_RUNTIME_SETTINGS,
            ENV_BIND_ADDR,
            ENV_ORCHESTRATOR_URL,
            ENV_LOG_FORMAT,
            ENV_CACHE_MAX_SIZE,
            ENV_COOKIE_TTL,
            ENV_INI_PATH,
            "OPENAI_API_KEY",
            "DROPBOX_APP_KEY",
            "DROPBOX_APP_SECRET",
            "DROPBOX_REFRESH_TOKEN",
            "WEB_SESSION_SECRET",
            "web_admin_pw",
            "AUTH0_CLIENT_SECRET",
        ] {
            // SAFETY: tests hold `ENV_LOCK` for the duration of any env mutation.
            unsafe { env::remove_var(var) };
        }
    }

    fn set_required_secrets() {
        // SAFETY: tests hold `ENV_LOCK` for the duration of any env mutation.
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-test");
            env::set_var("DROPBOX_APP_KEY", "app-key");
            env::set_var("DROPBOX_APP_SECRET", "app-secret");
            env::set_var("DROPBOX_REFRESH_TOKEN", "refresh-token");
            env::set_var("WEB_SESSION_SECRET", "session-secret");
        }
    }

    #[test]
    fn missing_required_secret_is_a_configuration_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let result = ApplicationConfig::load();
        assert!(matches!(result, Err(ConfigError::MissingVar { .. })));
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_secrets();
        let config = ApplicationConfig::load().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.admin_cookie_ttl_seconds, 3600);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn individual_env_var_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_secrets();
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe { env::set_var(ENV_BIND_ADDR, "0.0.0.0:9999") };
        let config = ApplicationConfig::load().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9999");
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe { env::remove_var(ENV_BIND_ADDR) };
    }

    #[test]
    fn json_grouping_takes_priority_over_individual_env_var() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_secrets();
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe {
            env::set_var(ENV_BIND_ADDR, "0.0.0.0:1111");
            env::set_var(ENV_RUNTIME_SETTINGS, r#"{"bind_addr":"0.0.0.0:2222"}"#);
        }
        let config = ApplicationConfig::load().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:2222");
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe {
            env::remove_var(ENV_BIND_ADDR);
            env::remove_var(ENV_RUNTIME_SETTINGS);
        }
    }

    #[test]
    fn cookie_ttl_is_clamped_to_the_valid_range() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_secrets();
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe { env::set_var(ENV_COOKIE_TTL, "99999") };
        let config = ApplicationConfig::load().unwrap();
        assert_eq!(config.admin_cookie_ttl_seconds, MAX_COOKIE_TTL);
        // SAFETY: guarded by `ENV_LOCK`.
        unsafe { env::remove_var(ENV_COOKIE_TTL) };
    }

    #[test]
    fn web_admin_password_is_optional() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        set_required_secrets();
        let config = ApplicationConfig::load().unwrap();
        assert!(config.web_admin_password.is_none());
    }
}
