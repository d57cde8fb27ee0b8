use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{error::CoordinateError, response::ResponseEnvelope, WeatherGovError};

/// A validated latitude/longitude pair.
///
/// Formats with the natural decimal representation of each component
/// (`39.7456,-97.0892`), which is the form `/points` expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A forecast office grid cell: `(gridId, gridX, gridY)`.
///
/// Read out of a points payload whenever it is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridReference {
    pub grid_id: String,
    pub grid_x: i64,
    pub grid_y: i64,
}

impl GridReference {
    /// Extract the grid cell from a `/points` payload.
    pub fn from_points(data: &Value) -> Option<Self> {
        let properties = data.get("properties")?;
        Some(Self {
            grid_id: properties.get("gridId")?.as_str()?.to_string(),
            grid_x: properties.get("gridX")?.as_i64()?,
            grid_y: properties.get("gridY")?.as_i64()?,
        })
    }

    pub fn forecast_path(&self) -> String {
        format!("/gridpoints/{self}/forecast")
    }

    pub fn forecast_hourly_path(&self) -> String {
        format!("/gridpoints/{self}/forecast/hourly")
    }
}

impl fmt::Display for GridReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{},{}", self.grid_id, self.grid_x, self.grid_y)
    }
}

/// A quantity as weather.gov reports it, e.g. `{"value": 22.8, "unitCode": "wmoUnit:degC"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub value: Option<f64>,
    #[serde(default)]
    pub unit_code: String,
}

impl Measurement {
    /// Unit without its namespace: `wmoUnit:degC` -> `degC`.
    pub fn unit(&self) -> &str {
        self.unit_code
            .rsplit_once(':')
            .map_or(self.unit_code.as_str(), |(_, unit)| unit)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{value} {}", self.unit()),
            None => f.write_str("n/a"),
        }
    }
}

#[derive(Deserialize)]
struct Document<T> {
    properties: T,
}

fn properties_of<T>(envelope: &ResponseEnvelope) -> Result<T, WeatherGovError>
where
    T: for<'de> Deserialize<'de>,
{
    let data = envelope.data()?;
    Document::<T>::deserialize(data)
        .map(|doc| doc.properties)
        .map_err(|e| WeatherGovError::decode(envelope.status(), e))
}

/// Typed view of `/stations/{id}/observations/latest`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub station: Option<String>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub text_description: Option<String>,
    pub temperature: Option<Measurement>,
    pub dewpoint: Option<Measurement>,
    pub wind_direction: Option<Measurement>,
    pub wind_speed: Option<Measurement>,
    pub barometric_pressure: Option<Measurement>,
    pub visibility: Option<Measurement>,
    pub relative_humidity: Option<Measurement>,
}

impl Observation {
    pub fn from_envelope(envelope: &ResponseEnvelope) -> Result<Self, WeatherGovError> {
        properties_of(envelope)
    }
}

/// Typed view of `/gridpoints/{id}/{x},{y}/forecast` (and `/forecast/hourly`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub updated: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub periods: Vec<ForecastPeriod>,
}

impl Forecast {
    pub fn from_envelope(envelope: &ResponseEnvelope) -> Result<Self, WeatherGovError> {
        properties_of(envelope)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub is_daytime: bool,
    pub temperature: Option<f64>,
    pub temperature_unit: Option<String>,
    pub probability_of_precipitation: Option<Measurement>,
    pub wind_speed: Option<String>,
    pub wind_direction: Option<String>,
    #[serde(default)]
    pub short_forecast: String,
    #[serde(default)]
    pub detailed_forecast: String,
}
