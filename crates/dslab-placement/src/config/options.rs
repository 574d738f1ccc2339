//! Parsing of `Name[key=value,...]` config strings used for policies and solvers.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{PlacementError, Result};

/// Config string split into a name and its `key=value` options.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValue {
    pub name: String,
    options: HashMap<String, String>,
}

impl ConfigValue {
    /// `AtLeast[count=2]` gives name `AtLeast` with option `count` = `2`, plain `Microlp` has no options.
    pub fn parse(config_str: &str) -> Self {
        let (name, options) = match config_str.trim().split_once('[') {
            Some((name, rest)) => (name, rest.trim_end().trim_end_matches(']')),
            None => (config_str.trim(), ""),
        };
        let options = options
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self {
            name: name.trim().to_string(),
            options,
        }
    }

    /// Returns the parsed option, `None` if absent.
    pub fn option<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.options
            .get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| PlacementError::Config(format!("bad {} option {}={}: {}", self.name, key, raw, e)))
            })
            .transpose()
    }

    /// Same as [`ConfigValue::option`] but fails if the option is absent.
    pub fn required_option<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.option(key)?
            .ok_or_else(|| PlacementError::Config(format!("{} has no {} option", self.name, key)))
    }
}
