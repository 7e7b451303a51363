//! Application configuration.
use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value '{value}' for '{key}': {reason}")]
pub struct ConfigError {
    key: String,
    value: String,
    reason: String,
}

/// String settings, ordered by key.
///
/// # Example
/// ```
/// use jbweb::config::Config;
///
/// let config = Config::from_vars("FLASKR_", vec![
///     ("FLASKR_DATABASE".to_string(), "/tmp/flaskr.db".to_string()),
///     ("FLASKR_PAGE_SIZE".to_string(), "20".to_string()),
///     ("HOME".to_string(), "/root".to_string()),
/// ]);
/// assert_eq!(config.get("database"), Some("/tmp/flaskr.db"));
/// assert_eq!(config.get_parsed::<u32>("page_size"), Ok(Some(20)));
/// assert_eq!(config.get("home"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Settings from `PREFIX_KEY=value` environment variables, keyed by
    /// the lower-cased rest of the name.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    pub fn from_vars<I: IntoIterator<Item = (String, String)>>(prefix: &str, vars: I) -> Self {
        Self::from_pairs(vars.into_iter().filter_map(|(name, value)| {
            name.strip_prefix(prefix)
                .filter(|key| !key.is_empty())
                .map(|key| (key.to_ascii_lowercase(), value))
        }))
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| &v[..])
    }

    /// A setting parsed into `T`; missing settings are `Ok(None)`.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|e: T::Err| ConfigError {
                key: key.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (&k[..], &v[..]))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut config = Config::new().with("user", "admin");
        config.set("password", "default");
        config.set("user", "root");
        assert_eq!(config.get("user"), Some("root"));
        assert_eq!(config.get("missing"), None);
        let keys: Vec<&str> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["password", "user"]);
    }

    #[test]
    fn test_get_parsed() {
        let config = Config::from_pairs(vec![("port", "8080"), ("debug", "maybe")]);
        assert_eq!(config.get_parsed::<u16>("port"), Ok(Some(8080)));
        assert_eq!(config.get_parsed::<u16>("other"), Ok(None));
        let err = config.get_parsed::<bool>("debug").unwrap_err();
        assert!(err.to_string().starts_with("invalid value 'maybe' for 'debug'"));
    }

    #[test]
    fn test_from_vars_ignores_bare_prefix() {
        let config = Config::from_vars("APP_", vec![("APP_".to_string(), "x".to_string())]);
        assert!(config.is_empty());
    }
}
