//! Skip token configuration and per-request query settings.
//!
//! Delimiters are an explicit, validated record instead of process-wide defaults:
//! - `field_delimiter` separates `name:value` fields (default `,`)
//! - `property_delimiter` separates a name from its literal (default `:`)
//!
//! The record deserializes from any `figment::Figment`, so it can live in a YAML
//! section or be overridden from the environment.

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::Error;

pub const DEFAULT_FIELD_DELIMITER: char = ',';
pub const DEFAULT_PROPERTY_DELIMITER: char = ':';

// Characters of unquoted number, date, time and guid literals. Fields are split on every
// occurrence of the field delimiter, so it must not be one of these.
const UNQUOTED_LITERAL_CHARS: [char; 4] = ['-', ':', '.', '+'];

/// Delimiters of the skip token grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkipTokenConfig {
    pub field_delimiter: char,
    pub property_delimiter: char,
}

impl Default for SkipTokenConfig {
    fn default() -> Self {
        Self {
            field_delimiter: DEFAULT_FIELD_DELIMITER,
            property_delimiter: DEFAULT_PROPERTY_DELIMITER,
        }
    }
}

impl SkipTokenConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if the delimiters collide with each other or with the
    /// literal grammar.
    pub fn new(field_delimiter: char, property_delimiter: char) -> Result<Self, Error> {
        let cfg = Self {
            field_delimiter,
            property_delimiter,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Extract and validate the configuration from a figment.
    ///
    /// Missing keys fall back to the defaults.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if extraction fails or the result does not validate.
    pub fn from_figment(figment: &Figment) -> Result<Self, Error> {
        let cfg: Self = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        tracing::debug!(
            field_delimiter = %cfg.field_delimiter,
            property_delimiter = %cfg.property_delimiter,
            "Loaded skip token configuration"
        );
        Ok(cfg)
    }

    /// Check delimiter invariants.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` on the first violated invariant.
    pub fn validate(&self) -> Result<(), Error> {
        if self.field_delimiter == self.property_delimiter {
            return Err(Error::InvalidConfig(format!(
                "field and property delimiters must differ (both '{}')",
                self.field_delimiter
            )));
        }
        for (name, c) in [
            ("field_delimiter", self.field_delimiter),
            ("property_delimiter", self.property_delimiter),
        ] {
            // quotes delimit string and enum literals
            if c == '\'' || c.is_alphanumeric() || c.is_whitespace() {
                return Err(Error::InvalidConfig(format!(
                    "{name} '{c}' conflicts with the literal grammar"
                )));
            }
        }
        if UNQUOTED_LITERAL_CHARS.contains(&self.field_delimiter) {
            return Err(Error::InvalidConfig(format!(
                "field_delimiter '{}' appears inside literals",
                self.field_delimiter
            )));
        }
        Ok(())
    }
}

/// Settings of one query-option evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Lift predicate constants into parameters so downstream plans can be cached.
    pub enable_constant_parameterization: bool,
}

impl QuerySettings {
    #[must_use]
    pub fn parameterized() -> Self {
        Self {
            enable_constant_parameterization: true,
        }
    }
}
