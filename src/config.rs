//! Runtime settings for the number formatter.
//!
//! Settings are layered: built-in defaults, then an optional configuration
//! file (any format the `config` crate understands, picked by extension), then
//! `TOOLCHEST_*` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

pub const ENV_PREFIX: &str = "TOOLCHEST";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grouping_separator: String,
    pub decimal_separator: String,
    pub max_fraction_digits: u32,
    /// Suffix marking the imaginary part of a complex number, `i` unless
    /// configured. Formatters following the JDK `ComplexFormat` default use
    /// `IMAGINARY` instead.
    pub imaginary_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grouping_separator: String::from(","),
            decimal_separator: String::from("."),
            max_fraction_digits: 2,
            imaginary_symbol: String::from("i"),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (if given and present) and the environment.
    pub fn load(path: Option<&str>) -> Result<Settings> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        debug!(?path, ?settings, "settings loaded");
        Ok(settings)
    }
}
