//! Process configuration sourced from environment variables.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use permgate_auth::{DEFAULT_TOKEN_TTL_SECS, Role, parse_role_list};
use permgate_observability::LogFormat;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Settings consumed by the authorization subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Shared signing/verification secret; also the admin bypass secret.
    pub api_secret: Option<String>,

    /// Roles every request gets, token or not.
    pub default_roles: Vec<Role>,

    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_secret: None,
            default_roles: Vec::new(),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

/// A subject to create at startup (`name:role1,role2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSeed {
    pub name: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
    pub subjects: Vec<SubjectSeed>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::invalid("BIND_ADDR", e.to_string()))?;

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw)
                .ok_or_else(|| ConfigError::invalid("LOG_FORMAT", format!("unknown format '{raw}'")))?,
            None => LogFormat::default(),
        };

        let api_secret = lookup("API_SECRET").filter(|s| !s.is_empty());

        let default_roles = lookup("AUTH_DEFAULT_ROLES")
            .map(|raw| parse_role_list(&raw))
            .unwrap_or_default();

        let token_ttl = match lookup("AUTH_TOKEN_TTL_SECS") {
            Some(raw) => {
                let secs: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid("AUTH_TOKEN_TTL_SECS", "not an integer"))?;
                if secs <= 0 {
                    return Err(ConfigError::invalid("AUTH_TOKEN_TTL_SECS", "must be positive"));
                }
                if secs > MAX_TOKEN_TTL_SECS {
                    return Err(ConfigError::invalid(
                        "AUTH_TOKEN_TTL_SECS",
                        format!("must not exceed {MAX_TOKEN_TTL_SECS}"),
                    ));
                }
                Duration::try_seconds(secs)
                    .ok_or_else(|| ConfigError::invalid("AUTH_TOKEN_TTL_SECS", "out of range"))?
            }
            None => Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        };

        let subjects = match lookup("AUTH_SUBJECTS") {
            Some(raw) => parse_subject_seeds(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            bind_addr,
            log_format,
            auth: AuthConfig {
                api_secret,
                default_roles,
                token_ttl,
            },
            subjects,
        })
    }
}

fn parse_subject_seeds(raw: &str) -> Result<Vec<SubjectSeed>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, roles) = entry.split_once(':').ok_or_else(|| {
                ConfigError::invalid("AUTH_SUBJECTS", format!("expected name:roles, got '{entry}'"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::invalid("AUTH_SUBJECTS", "subject name is empty"));
            }
            let roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| Role::new(r.to_string()))
                .collect();
            Ok(SubjectSeed {
                name: name.to_string(),
                roles,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.auth, AuthConfig::default());
        assert!(config.subjects.is_empty());
    }

    #[test]
    fn reads_auth_settings() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("API_SECRET", "this-is-a-long-secret"),
            ("AUTH_DEFAULT_ROLES", "readable,careportal activity"),
            ("AUTH_TOKEN_TTL_SECS", "600"),
            ("LOG_FORMAT", "text"),
        ]))
        .unwrap();

        assert_eq!(config.auth.api_secret.as_deref(), Some("this-is-a-long-secret"));
        assert_eq!(
            config.auth.default_roles,
            vec![Role::new("readable"), Role::new("careportal"), Role::new("activity")]
        );
        assert_eq!(config.auth.token_ttl, Duration::seconds(600));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn empty_secret_is_absent() {
        let config = ServerConfig::from_lookup(lookup(&[("API_SECRET", "")])).unwrap();
        assert_eq!(config.auth.api_secret, None);
    }

    #[test]
    fn parses_subject_seeds() {
        let config = ServerConfig::from_lookup(lookup(&[(
            "AUTH_SUBJECTS",
            "uploader:careportal,status-only; reader:readable",
        )]))
        .unwrap();

        assert_eq!(
            config.subjects,
            vec![
                SubjectSeed {
                    name: "uploader".to_string(),
                    roles: vec![Role::new("careportal"), Role::new("status-only")],
                },
                SubjectSeed {
                    name: "reader".to_string(),
                    roles: vec![Role::new("readable")],
                },
            ]
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("BIND_ADDR", "nope")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("AUTH_TOKEN_TTL_SECS", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("AUTH_SUBJECTS", "no-roles")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }

    #[test]
    fn rejects_token_ttl_beyond_the_bound() {
        for raw in ["9223372036854775807", "100000000000000", "31536001"] {
            let err = ServerConfig::from_lookup(lookup(&[("AUTH_TOKEN_TTL_SECS", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: "AUTH_TOKEN_TTL_SECS", .. }));
        }

        let max = MAX_TOKEN_TTL_SECS.to_string();
        let config = ServerConfig::from_lookup(lookup(&[("AUTH_TOKEN_TTL_SECS", max.as_str())])).unwrap();
        assert_eq!(config.auth.token_ttl, Duration::seconds(MAX_TOKEN_TTL_SECS));
    }
}
