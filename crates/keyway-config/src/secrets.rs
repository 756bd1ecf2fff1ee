//! Secret resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning)

/// Environment variable holding the token signing secret.
pub const TOKEN_SECRET_ENV: &str = "KEYWAY_TOKEN_SECRET";

/// Environment variable holding the GitHub OAuth client secret.
pub const GITHUB_SECRET_ENV: &str = "KEYWAY_GITHUB_CLIENT_SECRET";

/// Result of secret resolution with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve a secret from `env_var`, falling back to the config file value.
///
/// Empty values count as absent.
pub fn resolve_secret(env_var: &str, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_with(env_var, std::env::var(env_var).ok(), config_value)
}

fn resolve_with(
    env_var: &str,
    env_value: Option<String>,
    config_value: Option<&str>,
) -> Option<ResolvedSecret> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_wins_over_file() {
        let resolved =
            resolve_with(TOKEN_SECRET_ENV, Some("from-env".into()), Some("from-file")).unwrap();
        assert_eq!(resolved.value, "from-env");
        assert_eq!(
            resolved.source,
            SecretSource::EnvVar("KEYWAY_TOKEN_SECRET".into())
        );
    }

    #[test]
    fn test_file_fallback() {
        let resolved = resolve_with(TOKEN_SECRET_ENV, None, Some("from-file")).unwrap();
        assert_eq!(resolved.source, SecretSource::ConfigFile);
    }

    #[test]
    fn test_empty_values_are_absent() {
        assert!(resolve_with(TOKEN_SECRET_ENV, Some(String::new()), Some("")).is_none());
        assert!(resolve_with(TOKEN_SECRET_ENV, None, None).is_none());
    }

    #[test]
    fn test_debug_redacts_value() {
        let resolved = resolve_with(GITHUB_SECRET_ENV, None, Some("hunter2")).unwrap();
        let debug = format!("{resolved:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("ConfigFile"));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(
            SecretSource::EnvVar("X".into()).to_string(),
            "env var X"
        );
        assert_eq!(SecretSource::ConfigFile.to_string(), "config file (plaintext)");
    }
}
