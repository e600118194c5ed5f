use std::{fmt, net::SocketAddr, ops::RangeInclusive, str::FromStr};

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://gatechat.db?mode=rwc";
const MAX_SESSION_IDLE_MINUTES: i64 = 525_600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}={value}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

/// Argon2 cost parameters used for room and account passwords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordCost {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub session_idle_minutes: i64,
    pub feed_capacity: usize,
    pub admin: Option<AdminCredentials>,
    pub password_cost: PasswordCost,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            session_idle_minutes: 30,
            feed_capacity: 256,
            admin: None,
            password_cost: PasswordCost::default(),
        }
    }
}

impl Config {
    /// Reads `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = PasswordCost::default();

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => {
                let username = lookup("ADMIN_USERNAME").unwrap_or_else(|| {
                    email.split('@').next().unwrap_or("admin").to_owned()
                });
                Some(AdminCredentials { email, password, username })
            }
            (Some(_), None) => return Err(ConfigError::Incomplete("ADMIN_EMAIL", "ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("ADMIN_PASSWORD", "ADMIN_EMAIL")),
            (None, None) => None,
        };

        Ok(Config {
            bind_addr: parse_var(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            session_idle_minutes: in_range(
                parse_var(&lookup, "SESSION_IDLE_MINUTES", Some(30))?,
                "SESSION_IDLE_MINUTES",
                1..=MAX_SESSION_IDLE_MINUTES,
            )?,
            feed_capacity: in_range(
                parse_var(&lookup, "FEED_CAPACITY", Some(256))?,
                "FEED_CAPACITY",
                1..=usize::MAX / 2,
            )?,
            admin,
            password_cost: PasswordCost {
                memory_kib: parse_var(&lookup, "PASSWORD_MEMORY_KIB", Some(defaults.memory_kib))?,
                iterations: parse_var(&lookup, "PASSWORD_ITERATIONS", Some(defaults.iterations))?,
                parallelism: defaults.parallelism,
            },
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
            value,
        }),
        None => default.ok_or_else(|| ConfigError::InvalidValue {
            name,
            value: String::new(),
            reason: "missing".to_owned(),
        }),
    }
}

fn in_range<T>(value: T, name: &'static str, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: PartialOrd + fmt::Display,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: format!("must be between {} and {}", range.start(), range.end()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.session_idle_minutes, 30);
        assert_eq!(config.feed_capacity, 256);
        assert!(config.admin.is_none());
        assert_eq!(config.password_cost, PasswordCost::default());
    }

    #[test]
    fn admin_credentials_need_both_halves() {
        let err = Config::from_lookup(lookup_from(&[("ADMIN_EMAIL", "root@example.com")])).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete("ADMIN_EMAIL", "ADMIN_PASSWORD")));

        let config = Config::from_lookup(lookup_from(&[
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "hunter22"),
        ]))
        .unwrap();
        let admin = config.admin.unwrap();
        assert_eq!(admin.username, "root");
        assert!(!format!("{admin:?}").contains("hunter22"));
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = Config::from_lookup(lookup_from(&[("FEED_CAPACITY", "lots")])).unwrap_err();
        assert!(err.to_string().contains("FEED_CAPACITY=lots"));
    }

    #[test]
    fn session_idle_minutes_must_be_sane() {
        for bad in ["0", "-5", "525601", "9223372036854775807"] {
            let err = Config::from_lookup(lookup_from(&[("SESSION_IDLE_MINUTES", bad)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { name: "SESSION_IDLE_MINUTES", .. }),
                "{bad}: {err}"
            );
        }

        let config = Config::from_lookup(lookup_from(&[("SESSION_IDLE_MINUTES", "525600")])).unwrap();
        assert_eq!(config.session_idle_minutes, 525_600);
    }

    #[test]
    fn feed_needs_room_for_one_event() {
        let err = Config::from_lookup(lookup_from(&[("FEED_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "FEED_CAPACITY", .. }));
    }
}
