use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use config::{Config as ConfigLoader, Environment, Value};

use super::ConfigError;

/// Snapshot of environment variables with typed accessors.
///
/// Lookups take the upper-case variable name; empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    /// Builds a snapshot from explicit pairs instead of the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<HashMap<String, String>>();
        Self::load(Environment::default().source(Some(source)))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let raw: HashMap<String, Value> = ConfigLoader::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        let vars = raw
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .into_string()
                    .ok()
                    .map(|value| (key.to_lowercase(), value))
            })
            .collect();

        Ok(Self { vars })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn required(&self, name: &'static str) -> Result<&str, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    pub fn string_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_string()
    }

    pub fn required_parse<T>(&self, name: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        parse_value(name, self.required(name)?)
    }

    pub fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            Some(raw) => parse_value(name, raw),
            None => Ok(default),
        }
    }

    pub fn required_duration(&self, name: &'static str) -> Result<Duration, ConfigError> {
        parse_duration(name, self.required(name)?)
    }

    pub fn duration_or(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        match self.get(name) {
            Some(raw) => parse_duration(name, raw),
            None => Ok(default),
        }
    }

    /// `true` and `1` switch a flag on; any other non-empty value switches it off.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(raw) => {
                let raw = raw.trim();
                raw == "1" || raw.eq_ignore_ascii_case("true")
            }
            None => default,
        }
    }
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(name, e))
}

fn parse_duration(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::invalid(name, e))
}
