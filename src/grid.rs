//! Mapping geographic coordinates onto a model grid.
//!
//! The meteo.pl grids are model-native (Lambert conformal for WRF), so the
//! service itself performs the projection through its `latlon2rowcol`
//! endpoint. We range-check locally first so obviously bad input never leaves
//! the process.

use serde::{Deserialize, Serialize};

use crate::error::{MeteoError, Result};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(MeteoError::Conversion(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(MeteoError::Conversion(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// `lat%2Clon` as the conversion endpoint expects it.
    pub(crate) fn path_segment(&self) -> String {
        format!("{}%2C{}", self.latitude, self.longitude)
    }
}

/// A cell of a model grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub col: u32,
    pub row: u32,
}

impl GridPoint {
    /// Grid cells are addressed row first: `row%2Ccol`.
    pub(crate) fn path_segment(&self) -> String {
        format!("{}%2C{}", self.row, self.col)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversionReply {
    points: Vec<GridPoint>,
}

impl ConversionReply {
    pub(crate) fn first_point(self, coords: &Coordinates) -> Result<GridPoint> {
        self.points.into_iter().next().ok_or_else(|| {
            MeteoError::Conversion(format!(
                "no grid point returned for ({}, {})",
                coords.latitude, coords.longitude
            ))
        })
    }
}

pub(crate) fn parse_conversion(
    url: &str,
    body: serde_json::Value,
    coords: &Coordinates,
) -> Result<GridPoint> {
    let reply: ConversionReply = serde_json::from_value(body).map_err(|e| {
        MeteoError::Conversion(format!("malformed conversion reply from {}: {}", url, e))
    })?;
    reply.first_point(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WARSAW: Coordinates = Coordinates {
        latitude: 52.2297,
        longitude: 21.0122,
    };

    #[test]
    fn range_checks() {
        assert!(WARSAW.validate().is_ok());
        assert!(Coordinates::new(90.0, -180.0).validate().is_ok());
        assert!(matches!(
            Coordinates::new(91.0, 0.0).validate(),
            Err(MeteoError::Conversion(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, 180.5).validate(),
            Err(MeteoError::Conversion(_))
        ));
        assert!(Coordinates::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn path_segments() {
        assert_eq!(WARSAW.path_segment(), "52.2297%2C21.0122");
        assert_eq!(GridPoint { col: 150, row: 250 }.path_segment(), "250%2C150");
    }

    #[test]
    fn conversion_reply_takes_first_point() {
        let body = json!({"points": [{"col": 150, "row": 250}, {"col": 1, "row": 2}]});
        let p = parse_conversion("u", body, &WARSAW).unwrap();
        assert_eq!(p, GridPoint { col: 150, row: 250 });
    }

    #[test]
    fn conversion_reply_errors() {
        for body in [
            json!({"points": []}),
            json!({"error": "No points found"}),
            json!({"points": [{"col": "x", "row": 250}]}),
            json!({"points": [{"col": 150}]}),
        ] {
            assert!(matches!(
                parse_conversion("u", body, &WARSAW),
                Err(MeteoError::Conversion(_))
            ));
        }
    }
}
