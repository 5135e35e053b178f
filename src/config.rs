use std::fs;
use std::path::Path;
use std::str::FromStr;

use nom::bytes::complete::take_while1;
use nom::character::complete::{char, space0};
use nom::combinator::rest;
use nom::IResult;
use nom::Parser;

use crate::error::ConfigError;

/// Name of the reference engine's configuration file inside the config
/// directory.
pub const CONFIG_FILE: &str = "engine.conf";

/// Tunables for the reference engine.
///
/// Read from [`CONFIG_FILE`] in the configuration directory; a missing file
/// means defaults, while a present but unreadable or malformed file is a
/// configuration failure the engine reports as `ConfigDirError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Vertical grid resolution of the eye code.
    pub grid_rows: u16,
    /// Horizontal grid resolution of the eye code.
    pub grid_cols: u16,
    /// Minimum spread between the brightest and darkest grid cell for the
    /// image to count as containing an iris.
    pub min_contrast: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { grid_rows: 16, grid_cols: 16, min_contrast: 8 }
    }
}

impl EngineConfig {
    /// Loads the configuration from `config_dir`, falling back to defaults
    /// when no configuration file is present.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .map_err(|source| ConfigError::Read { path: path.clone(), source })?;

        let mut config = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            let (_, (key, value)) =
                key_value(line).map_err(|_| ConfigError::Parse { line: line.to_string() })?;

            match key {
                "grid_rows" => config.grid_rows = parse_value("grid_rows", value)?,
                "grid_cols" => config.grid_cols = parse_value("grid_cols", value)?,
                "min_contrast" => config.min_contrast = parse_value("min_contrast", value)?,
                _ => return Err(ConfigError::UnknownKey { key: key.to_string() }),
            }
        }

        if config.grid_rows == 0 || config.grid_cols == 0 {
            return Err(ConfigError::Value {
                key: "grid_rows/grid_cols",
                value: "0".to_string(),
            });
        }
        Ok(config)
    }
}

/// Parses one `name = value` line; keys are `[A-Za-z0-9_]+`, the value runs
/// to the end of the line.
pub(crate) fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = space0(input)?;
    let (input, key) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('=').parse(input)?;
    let (input, _) = space0(input)?;
    let (input, value) = rest(input)?;
    Ok((input, (key, value.trim_end())))
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Value { key, value: value.to_string() })
}
