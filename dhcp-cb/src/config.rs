//! Database access parameters.
//!
//! Parameters are given as a whitespace separated list of `key=value` pairs,
//! e.g. `name=/var/lib/dhcp-cb/config.db host=localhost`. `name` selects the
//! database file; `:memory:` opens a private in-memory database.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Storage engine implemented by this crate.
pub const BACKEND_TYPE: &str = "sqlite";

/// Database name selecting an in-memory database.
pub const MEMORY_DATABASE: &str = ":memory:";

pub const DEFAULT_HOST: &str = "localhost";

pub const DEFAULT_PORT: u16 = 0;

/// Parsed database access string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionParams {
    params: BTreeMap<String, String>,
}

impl ConnectionParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Requested storage engine, `sqlite` when not given.
    pub fn backend_type(&self) -> &str {
        self.get("type").unwrap_or(BACKEND_TYPE)
    }

    /// Database name.
    pub fn name(&self) -> Result<&str> {
        self.get("name")
            .ok_or_else(|| Error::Config("missing database name".to_string()))
    }

    pub fn host(&self) -> &str {
        self.get("host").unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> Result<u16> {
        match self.get("port") {
            None => Ok(DEFAULT_PORT),
            Some(port) => port
                .parse()
                .map_err(|_| Error::Config(format!("invalid port '{}'", port))),
        }
    }
}

impl FromStr for ConnectionParams {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut params = BTreeMap::new();
        for token in s.split_whitespace() {
            let (key, value) = token
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| Error::Config(format!("invalid access string token '{}'", token)))?;
            params.insert(key.to_string(), value.to_string());
        }
        Ok(Self { params })
    }
}

/// Access string with the password hidden, for logging.
impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.params {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if key == "password" {
                write!(f, "{}=*****", key)?;
            } else {
                write!(f, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_access_string() {
        let params: ConnectionParams = "name=keatest user=keatest password=secret host=db1 port=3306"
            .parse()
            .unwrap();
        assert_eq!(params.name().unwrap(), "keatest");
        assert_eq!(params.host(), "db1");
        assert_eq!(params.port().unwrap(), 3306);
        assert_eq!(params.get("user"), Some("keatest"));
        assert_eq!(params.backend_type(), "sqlite");
    }

    #[test]
    fn test_defaults() {
        let params: ConnectionParams = "name=:memory:".parse().unwrap();
        assert_eq!(params.host(), "localhost");
        assert_eq!(params.port().unwrap(), 0);
    }

    #[test]
    fn test_invalid_access_strings() {
        assert!(matches!(
            "name=db garbage".parse::<ConnectionParams>(),
            Err(Error::Config(_))
        ));
        assert!("=value".parse::<ConnectionParams>().is_err());

        let params: ConnectionParams = "port=http".parse().unwrap();
        assert!(params.port().is_err());
        assert!(params.name().is_err());
    }

    #[test]
    fn test_display_hides_password() {
        let params: ConnectionParams = "name=db password=secret".parse().unwrap();
        assert_eq!(params.to_string(), "name=db password=*****");
    }
}
