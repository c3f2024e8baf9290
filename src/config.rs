use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
    time::Duration,
};

pub const BACKEND_URL_ENV: &str = "LATWEB_BACKEND_URL";
pub const TIMEOUT_SECS_ENV: &str = "LATWEB_TIMEOUT_SECS";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/services/lbjson.py";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

static OVERRIDES: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn normalized_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Sets an in-process value for `env_var`; a blank value clears it.
pub fn set_override(env_var: &str, configured: &str) {
    let mut guard = OVERRIDES
        .write()
        .expect("Config override lock poisoned for write");
    if let Some(value) = normalized_non_empty(configured) {
        guard.insert(env_var.to_string(), value);
    } else {
        guard.remove(env_var);
    }
}

pub fn get_override(env_var: &str) -> Option<String> {
    OVERRIDES
        .read()
        .expect("Config override lock poisoned for read")
        .get(env_var)
        .cloned()
}

/// Override first, then the environment.
pub fn configured_or_env(env_var: &str) -> Option<String> {
    get_override(env_var).or_else(|| {
        std::env::var(env_var)
            .ok()
            .and_then(|v| normalized_non_empty(&v))
    })
}

pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

fn url_or_default(configured: Option<String>) -> String {
    configured
        .and_then(|v| normalize_base_url(&v))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
}

/// Unparsable or zero values fall back to the default.
fn timeout_or_default(configured: Option<String>) -> Duration {
    let secs = configured
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

pub fn backend_url() -> String {
    url_or_default(configured_or_env(BACKEND_URL_ENV))
}

pub fn request_timeout() -> Duration {
    timeout_or_default(configured_or_env(TIMEOUT_SECS_ENV))
}

/// Where the backend URL currently comes from, for diagnostics.
pub fn backend_url_source() -> &'static str {
    if get_override(BACKEND_URL_ENV).is_some() {
        "override"
    } else if configured_or_env(BACKEND_URL_ENV).is_some() {
        "environment"
    } else {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_get_a_scheme_and_lose_trailing_slashes() {
        assert_eq!(
            normalize_base_url("localhost:8000/services/lbjson.py/").as_deref(),
            Some("http://localhost:8000/services/lbjson.py")
        );
        assert_eq!(
            normalize_base_url(" https://example.org// ").as_deref(),
            Some("https://example.org")
        );
        assert_eq!(normalize_base_url("   "), None);
    }

    #[test]
    fn unset_values_use_the_defaults() {
        assert_eq!(url_or_default(None), DEFAULT_BACKEND_URL);
        assert_eq!(url_or_default(Some("  ".to_string())), DEFAULT_BACKEND_URL);
        assert_eq!(
            url_or_default(Some("lb.example.org:8080/rpc/".to_string())),
            "http://lb.example.org:8080/rpc"
        );
        let default = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        assert_eq!(timeout_or_default(None), default);
        assert_eq!(timeout_or_default(Some("0".to_string())), default);
        assert_eq!(timeout_or_default(Some("soon".to_string())), default);
        assert_eq!(timeout_or_default(Some("-5".to_string())), default);
        assert_eq!(
            timeout_or_default(Some(" 30 ".to_string())),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn environment_then_override() {
        let key = "LATWEB_TEST_ONLY_RESOLUTION";
        assert_eq!(configured_or_env(key), None);
        // SAFETY: the key is used by this test alone.
        unsafe { std::env::set_var(key, " from-env ") };
        assert_eq!(configured_or_env(key).as_deref(), Some("from-env"));
        set_override(key, "from-override");
        assert_eq!(configured_or_env(key).as_deref(), Some("from-override"));
        set_override(key, "");
        assert_eq!(configured_or_env(key).as_deref(), Some("from-env"));
        unsafe { std::env::remove_var(key) };
        assert_eq!(configured_or_env(key), None);
    }

    #[test]
    fn override_wins_and_blank_clears() {
        let key = "LATWEB_TEST_ONLY_OVERRIDE";
        set_override(key, " value ");
        assert_eq!(configured_or_env(key).as_deref(), Some("value"));
        set_override(key, "");
        assert_eq!(get_override(key), None);
    }
}
