//! Server configuration.

use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

const ADDR_VAR: &str = "WAYPOST_ADDR";
const SECRET_KEY_VAR: &str = "WAYPOST_SECRET_KEY";

/// Immutable server settings, fixed at construction.
///
/// `secret_key` is carried for consumers outside the server itself; the
/// server never reads it and `Debug` never prints it.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// `host:port`, or `:port` for every IPv4 interface (`0.0.0.0:port`).
    /// Use `[::]:port` to listen on IPv6 as well.
    pub addr: String,
    #[serde(default)]
    pub secret_key: String,
}

impl Config {
    pub fn new(addr: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self { addr: addr.into(), secret_key: secret_key.into() }
    }

    /// Reads `WAYPOST_ADDR` (required) and `WAYPOST_SECRET_KEY` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup(ADDR_VAR).ok_or(ConfigError::Missing(ADDR_VAR))?;
        if addr.trim().is_empty() {
            return Err(ConfigError::Empty { name: ADDR_VAR });
        }
        let secret_key = lookup(SECRET_KEY_VAR).unwrap_or_default();
        Ok(Self { addr, secret_key })
    }

    /// The address to hand to the socket layer.
    pub(crate) fn bind_addr(&self) -> String {
        if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn reads_both_settings() {
        let config =
            Config::from_lookup(lookup(&[("WAYPOST_ADDR", ":9000"), ("WAYPOST_SECRET_KEY", "s3cr3t")]))
                .unwrap();
        assert_eq!(config.addr, ":9000");
        assert_eq!(config.secret_key, "s3cr3t");
    }

    #[test]
    fn addr_is_required_and_non_empty() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("WAYPOST_ADDR"))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("WAYPOST_ADDR", "  ")])),
            Err(ConfigError::Empty { .. })
        ));
    }

    #[test]
    fn port_only_addr_binds_every_ipv4_interface() {
        assert_eq!(Config::new(":8080", "").bind_addr(), "0.0.0.0:8080");
        assert_eq!(Config::new("127.0.0.1:0", "").bind_addr(), "127.0.0.1:0");
        assert_eq!(Config::new("[::]:8080", "").bind_addr(), "[::]:8080");
    }

    #[test]
    fn deserializes_with_optional_secret() {
        let config: Config = serde_json::from_str(r#"{"addr":"127.0.0.1:3000"}"#).unwrap();
        assert_eq!(config.addr, "127.0.0.1:3000");
        assert!(config.secret_key.is_empty());
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", Config::new(":80", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
