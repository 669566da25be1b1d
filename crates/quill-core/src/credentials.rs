//! API-key resolution.
//!
//! Order: `GEMINI_API_KEY`, then `GOOGLE_API_KEY`, then the same keys in a
//! TOML secrets file. A missing file is not an error; an unreadable one is.

use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;

pub const ENV_KEYS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Resolve the backend API key from the process environment and `secrets_file`.
pub fn resolve_api_key(secrets_file: Option<&Path>) -> Result<Option<String>, ConfigError> {
    resolve_with(|key| std::env::var(key).ok(), secrets_file)
}

/// Like [`resolve_api_key`] with an injectable environment lookup.
pub fn resolve_with(
    env: impl Fn(&str) -> Option<String>,
    secrets_file: Option<&Path>,
) -> Result<Option<String>, ConfigError> {
    for key in ENV_KEYS {
        if let Some(v) = env(key).filter(|v| !v.trim().is_empty()) {
            debug!(source = key, "api key found in environment");
            return Ok(Some(v));
        }
    }

    let Some(path) = secrets_file.filter(|p| p.exists()) else {
        return Ok(None);
    };
    let secrets_err = |message: String| ConfigError::Secrets {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| secrets_err(e.to_string()))?;
    let table: toml::Table = toml::from_str(&raw).map_err(|e| secrets_err(e.to_string()))?;

    // The secrets file conventionally uses GOOGLE_API_KEY; accept either.
    for key in ENV_KEYS.iter().rev() {
        if let Some(v) = table.get(*key).and_then(|v| v.as_str()).filter(|v| !v.trim().is_empty()) {
            debug!(source = %path.display(), key, "api key found in secrets file");
            return Ok(Some(v.to_owned()));
        }
    }
    Ok(None)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn temp_file(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("quill-{}-{name}", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn gemini_key_wins_over_google_key() {
        let env = |k: &str| match k {
            "GEMINI_API_KEY" => Some("gemini".to_owned()),
            "GOOGLE_API_KEY" => Some("google".to_owned()),
            _ => None,
        };
        assert_eq!(resolve_with(env, None).unwrap().as_deref(), Some("gemini"));
    }

    #[test]
    fn blank_env_values_are_skipped() {
        let env = |k: &str| match k {
            "GEMINI_API_KEY" => Some("  ".to_owned()),
            "GOOGLE_API_KEY" => Some("google".to_owned()),
            _ => None,
        };
        assert_eq!(resolve_with(env, None).unwrap().as_deref(), Some("google"));
    }

    #[test]
    fn falls_back_to_secrets_file() {
        let path = temp_file("secrets.toml", "GOOGLE_API_KEY = \"from-file\"\n");
        let key = resolve_with(no_env, Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(key.as_deref(), Some("from-file"));
    }

    #[test]
    fn missing_file_means_no_key() {
        let path = std::env::temp_dir().join("quill-definitely-missing.toml");
        assert_eq!(resolve_with(no_env, Some(path.as_path())).unwrap(), None);
        assert_eq!(resolve_with(no_env, None).unwrap(), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = temp_file("broken.toml", "GOOGLE_API_KEY = ");
        let err = resolve_with(no_env, Some(path.as_path())).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Secrets { .. }));
    }
}
