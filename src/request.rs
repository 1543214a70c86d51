use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MeteoError, Result};
use crate::util::check_segment;

/// Forecast models served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Wrf,
    Coamps,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Wrf => "wrf",
            Model::Coamps => "coamps",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrf" => Ok(Model::Wrf),
            "coamps" => Ok(Model::Coamps),
            other => Err(MeteoError::Validation(format!(
                "unsupported model `{}` (expected one of: wrf, coamps)",
                other
            ))),
        }
    }
}

/// A meteorological variable at a vertical level, e.g. `("T2", 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub level: i32,
}

impl Field {
    pub fn new(name: impl Into<String>, level: i32) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

impl<S: Into<String>> From<(S, i32)> for Field {
    fn from((name, level): (S, i32)) -> Self {
        Field::new(name, level)
    }
}

/// What to ask the API for: model, grid and an ordered list of fields.
///
/// A config handed to [`crate::Client::get_forecast`] replaces the client's
/// default config as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub model: Model,
    pub grid: String,
    pub fields: Vec<Field>,
}

const DEFAULT_GRID: &str = "d02_XLONG_XLAT";

const DEFAULT_FIELDS: &[&str] = &[
    "TSK",       // ground temperature
    "T2",        // air temperature 2 m above ground
    "RAINNC",    // accumulated rain, mm
    "SNOWNC",    // accumulated snow, mm
    "HAILNC",    // accumulated hail, mm
    "U10",       // wind U component at 10 m
    "V10",       // wind V component at 10 m
    "WSPD10MAX", // max wind speed at 10 m (gusts)
    "SWDOWN",    // downward shortwave radiation flux
    "PSFC",      // surface pressure
];

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model: Model::Wrf,
            grid: DEFAULT_GRID.to_string(),
            fields: DEFAULT_FIELDS.iter().map(|n| Field::new(*n, 0)).collect(),
        }
    }
}

impl ForecastConfig {
    pub fn new<F, I>(model: Model, grid: impl Into<String>, fields: I) -> Self
    where
        F: Into<Field>,
        I: IntoIterator<Item = F>,
    {
        Self {
            model,
            grid: grid.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the config shape. Runs before any network call.
    pub fn validate(&self) -> Result<()> {
        check_segment("grid", &self.grid)?;
        if self.fields.is_empty() {
            return Err(MeteoError::Validation(
                "fields must contain at least one (name, level) pair".to_string(),
            ));
        }
        for field in &self.fields {
            check_segment("field name", &field.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ForecastConfig::default();
        assert_eq!(cfg.model, Model::Wrf);
        assert_eq!(cfg.grid, "d02_XLONG_XLAT");
        assert_eq!(cfg.fields.len(), 10);
        assert_eq!(cfg.fields[0], Field::new("TSK", 0));
        assert_eq!(cfg.fields[9], Field::new("PSFC", 0));
        cfg.validate().unwrap();
    }

    #[test]
    fn model_parsing() {
        assert_eq!("wrf".parse::<Model>().unwrap(), Model::Wrf);
        assert_eq!("COAMPS".parse::<Model>().unwrap(), Model::Coamps);
        assert!(matches!(
            "gfs".parse::<Model>(),
            Err(MeteoError::Validation(_))
        ));
    }

    #[test]
    fn empty_fields_rejected() {
        let cfg = ForecastConfig::new(Model::Wrf, "d01_XLONG_XLAT", Vec::<Field>::new());
        assert!(matches!(cfg.validate(), Err(MeteoError::Validation(_))));
    }

    #[test]
    fn empty_grid_rejected() {
        let cfg = ForecastConfig::new(Model::Wrf, " ", [("T2", 0)]);
        assert!(matches!(cfg.validate(), Err(MeteoError::Validation(_))));
    }

    #[test]
    fn blank_field_name_rejected() {
        let cfg = ForecastConfig::new(Model::Wrf, "d01_XLONG_XLAT", [("T2", 0), ("", 0)]);
        assert!(matches!(cfg.validate(), Err(MeteoError::Validation(_))));
    }

    #[test]
    fn deserializes_from_json() {
        let cfg: ForecastConfig = serde_json::from_str(
            r#"{"model": "wrf", "grid": "d01_XLONG_XLAT",
                "fields": [{"name": "T2", "level": 0}, {"name": "RAINNC", "level": 0}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.fields[1].name, "RAINNC");

        let bad = serde_json::from_str::<ForecastConfig>(
            r#"{"model": "nope", "grid": "g", "fields": []}"#,
        );
        assert!(bad.is_err());
    }
}
