use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::fmt::Write as _;

use weathergov_core::{
    Forecast, GridReference, Measurement, Observation, ResponseEnvelope, WeatherGovError,
};

fn timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M %:z").to_string()
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{label:<14}{value}");
}

fn text<'a>(data: &'a Value, pointer: &str) -> Option<&'a str> {
    data.pointer(pointer).and_then(Value::as_str)
}

pub fn points(response: &ResponseEnvelope) -> Result<String, WeatherGovError> {
    let data = response.data()?;
    let mut out = String::new();

    if let (Some(city), Some(state)) = (
        text(data, "/properties/relativeLocation/properties/city"),
        text(data, "/properties/relativeLocation/properties/state"),
    ) {
        line(&mut out, "Near:", format!("{city}, {state}"));
    }
    match GridReference::from_points(data) {
        Some(grid) => line(&mut out, "Grid:", grid),
        None => line(&mut out, "Grid:", "unknown"),
    }
    if let Some(office) = text(data, "/properties/cwa") {
        line(&mut out, "Office:", office);
    }
    if let Some(zone) = text(data, "/properties/timeZone") {
        line(&mut out, "Time zone:", zone);
    }
    if let Some(url) = text(data, "/properties/forecast") {
        line(&mut out, "Forecast:", url);
    }
    if let Some(url) = text(data, "/properties/observationStations") {
        line(&mut out, "Stations:", url);
    }

    Ok(out.trim_end().to_string())
}

pub fn stations(response: &ResponseEnvelope) -> Result<String, WeatherGovError> {
    let data = response.data()?;
    let features = data
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if features.is_empty() {
        return Ok("No observation stations found.".to_string());
    }

    let rows = features
        .iter()
        .map(|feature| {
            let id = text(feature, "/properties/stationIdentifier").unwrap_or("?");
            let name = text(feature, "/properties/name").unwrap_or("");
            format!("{id:<6}{name}")
        })
        .collect::<Vec<_>>();

    Ok(rows.join("\n"))
}

fn measurement(value: &Option<Measurement>) -> String {
    value
        .as_ref()
        .map_or_else(|| "n/a".to_string(), ToString::to_string)
}

pub fn observation(obs: &Observation) -> String {
    let mut out = String::new();

    if let Some(ts) = &obs.timestamp {
        line(&mut out, "Observed:", timestamp(ts));
    }
    if let Some(description) = obs.text_description.as_deref().filter(|d| !d.is_empty()) {
        line(&mut out, "Conditions:", description);
    }
    line(&mut out, "Temperature:", measurement(&obs.temperature));
    line(&mut out, "Dewpoint:", measurement(&obs.dewpoint));
    line(&mut out, "Humidity:", measurement(&obs.relative_humidity));
    line(&mut out, "Wind:", format!(
        "{} from {}",
        measurement(&obs.wind_speed),
        measurement(&obs.wind_direction)
    ));
    line(&mut out, "Pressure:", measurement(&obs.barometric_pressure));
    line(&mut out, "Visibility:", measurement(&obs.visibility));

    out.trim_end().to_string()
}

pub fn forecast(forecast: &Forecast, periods: usize) -> String {
    let mut out = String::new();

    if let Some(updated) = &forecast.updated {
        let _ = writeln!(out, "Updated {}\n", timestamp(updated));
    }

    for period in forecast.periods.iter().take(periods) {
        let name = if period.name.is_empty() {
            timestamp(&period.start_time)
        } else {
            period.name.clone()
        };
        let temperature = match (period.temperature, period.temperature_unit.as_deref()) {
            (Some(t), Some(unit)) => format!("{t}°{unit}"),
            (Some(t), None) => t.to_string(),
            (None, _) => "n/a".to_string(),
        };
        let wind = match (&period.wind_speed, &period.wind_direction) {
            (Some(speed), Some(direction)) => format!(", wind {direction} {speed}"),
            (Some(speed), None) => format!(", wind {speed}"),
            _ => String::new(),
        };
        let _ = writeln!(out, "{name:<18}{temperature:>7}  {}{wind}", period.short_forecast);
    }

    if forecast.periods.is_empty() {
        out.push_str("No forecast periods available.");
    }

    out.trim_end().to_string()
}
