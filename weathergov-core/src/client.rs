//! The weather.gov client and its chained lookups.
//!
//! ```text
//! points ──► observation_stations ──► current_weather
//!   └──────► forecast / forecast_hourly
//! ```
//!
//! Every operation validates its coordinate before touching the network,
//! issues its requests one after another, and either returns a fully
//! decoded [`ResponseEnvelope`] or exactly one [`WeatherGovError`]. Errors
//! from an earlier step are returned unchanged.

use reqwest::Url;
use serde_json::Value;

use crate::{
    classify::{Outcome, classify},
    config::ClientConfig,
    error::WeatherGovError,
    model::{Coordinate, GridReference},
    response::ResponseEnvelope,
    transport::{HttpTransport, Transport},
};

#[derive(Debug, Clone)]
pub struct WeatherGovClient<T = HttpTransport> {
    config: ClientConfig,
    base_host: String,
    /// Path of the base URL, without a trailing slash ("" for a bare host).
    base_path: String,
    transport: T,
}

impl WeatherGovClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, WeatherGovError> {
        let transport = HttpTransport::new(&config)
            .map_err(|e| WeatherGovError::InvalidConfig(e.to_string()))?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> WeatherGovClient<T> {
    /// Build a client over any transport, e.g. a stub in tests.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, WeatherGovError> {
        let (base_host, base_path) = Url::parse(config.base_url())
            .ok()
            .and_then(|url| {
                let host = url.host_str()?.to_owned();
                Some((host, url.path().trim_end_matches('/').to_owned()))
            })
            .ok_or_else(|| {
                WeatherGovError::InvalidConfig(format!("invalid base URL: {}", config.base_url()))
            })?;

        Ok(Self {
            config,
            base_host,
            base_path,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve a coordinate to its grid cell (`GET /points/{lat},{lon}`).
    pub async fn points(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResponseEnvelope, WeatherGovError> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        self.fetch(&format!("/points/{coordinate}")).await
    }

    /// Observation stations nearest to a coordinate.
    ///
    /// Follows the `observationStations` link of the points payload. The link
    /// is only followed when it points at the configured host.
    pub async fn observation_stations(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResponseEnvelope, WeatherGovError> {
        let points = self.points(latitude, longitude).await?;

        let stations_url = points
            .data()?
            .pointer("/properties/observationStations")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WeatherGovError::client("No observation stations URL found in points response")
            })?;

        let path = self.trusted_path(stations_url)?;
        self.fetch(&path).await
    }

    /// Latest observation from the station nearest to a coordinate.
    pub async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResponseEnvelope, WeatherGovError> {
        let stations = self.observation_stations(latitude, longitude).await?;

        let station = stations
            .data()?
            .pointer("/features/0")
            .ok_or_else(|| WeatherGovError::client("No observation stations found"))?;

        let station_id = station
            .pointer("/properties/stationIdentifier")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WeatherGovError::client(
                    "No station identifier found in observation stations response",
                )
            })?;

        self.latest_observation(station_id).await
    }

    /// Latest observation for a known station (`GET /stations/{id}/observations/latest`).
    pub async fn latest_observation(
        &self,
        station_id: &str,
    ) -> Result<ResponseEnvelope, WeatherGovError> {
        if station_id.is_empty() || !station_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(WeatherGovError::client(format!(
                "Invalid station identifier: {station_id}"
            )));
        }

        self.fetch(&format!("/stations/{station_id}/observations/latest"))
            .await
    }

    /// Multi-period forecast for the grid cell containing a coordinate.
    pub async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResponseEnvelope, WeatherGovError> {
        let grid = self.grid_reference(latitude, longitude).await?;
        self.fetch(&grid.forecast_path()).await
    }

    /// Hour-by-hour forecast for the grid cell containing a coordinate.
    pub async fn forecast_hourly(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResponseEnvelope, WeatherGovError> {
        let grid = self.grid_reference(latitude, longitude).await?;
        self.fetch(&grid.forecast_hourly_path()).await
    }

    async fn grid_reference(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<GridReference, WeatherGovError> {
        let points = self.points(latitude, longitude).await?;
        GridReference::from_points(points.data()?)
            .ok_or_else(|| WeatherGovError::client("No grid reference found in points response"))
    }

    /// Path of a link from a payload, provided it targets our own host.
    ///
    /// Only the host is compared; the scheme and port of the link are
    /// discarded along with the host. The returned path is relative to the
    /// base URL, since the transport prepends the base path itself.
    fn trusted_path(&self, url: &str) -> Result<String, WeatherGovError> {
        match Url::parse(url) {
            Ok(parsed) if parsed.host_str() == Some(self.base_host.as_str()) => {
                let path = parsed.path();
                let relative = path
                    .strip_prefix(self.base_path.as_str())
                    .filter(|rest| rest.starts_with('/'))
                    .unwrap_or(path);
                Ok(relative.to_string())
            }
            _ => {
                tracing::warn!(url, expected_host = %self.base_host, "refusing to follow link to another host");
                Err(WeatherGovError::client(format!(
                    "Invalid observation stations URL: {url}"
                )))
            }
        }
    }

    async fn fetch(&self, path: &str) -> Result<ResponseEnvelope, WeatherGovError> {
        tracing::debug!(path, "GET weather.gov");

        let raw = self
            .transport
            .get(path)
            .await
            .map_err(|e| classify(Outcome::Transport(e)))?;

        let envelope = ResponseEnvelope::new(raw.status, raw.body);
        if !envelope.is_success() {
            return Err(classify(Outcome::Response(&envelope)));
        }

        envelope.data()?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::FaultKind,
        transport::{RawResponse, TransportError},
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::{collections::HashMap, sync::Mutex};

    const POINTS_PATH: &str = "/points/39.7456,-97.0892";
    const STATIONS_URL: &str = "https://api.weather.gov/gridpoints/TOP/31,80/stations";
    const STATIONS_PATH: &str = "/gridpoints/TOP/31,80/stations";
    const OBSERVATION_PATH: &str = "/stations/KTOP/observations/latest";

    /// Serves canned responses by path and records every request.
    #[derive(Debug, Default)]
    struct StubTransport {
        routes: HashMap<String, Result<RawResponse, TransportError>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn respond(mut self, path: &str, status: u16, body: impl ToString) -> Self {
            self.routes
                .insert(path.to_string(), Ok(RawResponse::new(status, body.to_string())));
            self
        }

        fn fail(mut self, path: &str, err: TransportError) -> Self {
            self.routes.insert(path.to_string(), Err(err));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn get(&self, path: &str) -> Result<RawResponse, TransportError> {
            self.calls.lock().unwrap().push(path.to_string());
            self.routes
                .get(path)
                .cloned()
                .unwrap_or_else(|| Ok(RawResponse::new(404, r#"{"title":"Not Found"}"#)))
        }
    }

    fn client(stub: StubTransport) -> WeatherGovClient<StubTransport> {
        WeatherGovClient::with_transport(ClientConfig::default(), stub).expect("client")
    }

    fn points_body() -> Value {
        json!({
            "properties": {
                "gridId": "TOP",
                "gridX": 31,
                "gridY": 80,
                "observationStations": STATIONS_URL
            }
        })
    }

    fn stations_body() -> Value {
        json!({
            "features": [
                { "properties": { "stationIdentifier": "KTOP", "name": "TOPEKA FORBES FIELD" } }
            ]
        })
    }

    fn observation_body() -> Value {
        json!({
            "properties": { "temperature": { "value": 22.8, "unitCode": "unit:degC" } }
        })
    }

    #[tokio::test]
    async fn invalid_coordinates_never_reach_the_network() {
        let client = client(StubTransport::default());

        for (lat, lon) in [(91.0, 0.0), (0.0, 181.0), (-90.1, 0.0), (0.0, -180.5), (91.0, 181.0)] {
            let results = [
                client.points(lat, lon).await,
                client.observation_stations(lat, lon).await,
                client.current_weather(lat, lon).await,
                client.forecast(lat, lon).await,
                client.forecast_hourly(lat, lon).await,
            ];
            for result in results {
                let err = result.unwrap_err();
                assert!(matches!(err, WeatherGovError::InvalidCoordinate(_)), "got {err:?}");
                assert_eq!(err.kind(), FaultKind::Precondition);
            }
        }

        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn points_returns_envelope() {
        let stub = StubTransport::default().respond(
            POINTS_PATH,
            200,
            json!({ "properties": { "observationStations": STATIONS_URL } }),
        );
        let client = client(stub);

        let response = client.points(39.7456, -97.0892).await.expect("points");

        assert!(response.is_success());
        let data = response.data().expect("data");
        assert_eq!(data["properties"]["observationStations"], STATIONS_URL);
        assert_eq!(client.transport().calls(), vec![POINTS_PATH]);
    }

    #[tokio::test]
    async fn points_not_found_raises_client_fault_with_title() {
        let stub = StubTransport::default().respond(
            "/points/48.8575,2.3514",
            404,
            json!({
                "title": "Data Unavailable For Requested Point",
                "detail": "Unable to provide data for requested point 48.8575,2.3514",
                "status": 404
            }),
        );
        let client = client(stub);

        let err = client.points(48.8575, 2.3514).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(err.to_string(), "Data Unavailable For Requested Point");
        assert_eq!(err.problem().and_then(|p| p.status), Some(404));
    }

    #[tokio::test]
    async fn points_timeout_is_network_fault() {
        let stub = StubTransport::default().fail(POINTS_PATH, TransportError::timeout("timeout"));
        let client = client(stub);

        let err = client.points(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_network_fault());
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn server_error_with_html_body() {
        let stub = StubTransport::default().respond(POINTS_PATH, 500, "<h1>Internal Server Error</h1>");
        let client = client(stub);

        let err = client.points(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_server_fault());
        assert_eq!(
            err.to_string(),
            "API request failed with status 500 but could not parse error response."
        );
    }

    #[tokio::test]
    async fn success_with_malformed_body_is_decode_fault() {
        let stub = StubTransport::default().respond(POINTS_PATH, 200, "{\"properties\":");
        let client = client(stub);

        let err = client.points(39.7456, -97.0892).await.unwrap_err();

        assert!(matches!(err, WeatherGovError::Decode { status: 200, .. }));
        assert!(err.is_server_fault());
    }

    #[tokio::test]
    async fn observation_stations_follows_link_path() {
        let stub = StubTransport::default()
            .respond(POINTS_PATH, 200, points_body())
            .respond(STATIONS_PATH, 200, stations_body());
        let client = client(stub);

        let response = client.observation_stations(39.7456, -97.0892).await.expect("stations");

        let data = response.data().expect("data");
        assert_eq!(data["features"][0]["properties"]["stationIdentifier"], "KTOP");
        assert_eq!(client.transport().calls(), vec![POINTS_PATH, STATIONS_PATH]);
    }

    #[tokio::test]
    async fn observation_stations_requires_link() {
        let stub = StubTransport::default().respond("/points/0,0", 200, json!({ "properties": {} }));
        let client = client(stub);

        let err = client.observation_stations(0.0, 0.0).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(err.to_string(), "No observation stations URL found in points response");
    }

    #[tokio::test]
    async fn observation_stations_rejects_foreign_host() {
        let stub = StubTransport::default().respond(
            POINTS_PATH,
            200,
            json!({ "properties": { "observationStations": "https://malicious.example.com/stations" } }),
        );
        let client = client(stub);

        let err = client.observation_stations(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(
            err.to_string(),
            "Invalid observation stations URL: https://malicious.example.com/stations"
        );
        assert_eq!(client.transport().calls(), vec![POINTS_PATH]);
    }

    #[tokio::test]
    async fn observation_stations_rejects_unparsable_link() {
        let stub = StubTransport::default().respond(
            POINTS_PATH,
            200,
            json!({ "properties": { "observationStations": "/gridpoints/TOP/31,80/stations" } }),
        );
        let client = client(stub);

        let err = client.observation_stations(39.7456, -97.0892).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid observation stations URL: /gridpoints/TOP/31,80/stations"
        );
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn observation_stations_compares_host_only() {
        let stub = StubTransport::default()
            .respond(
                POINTS_PATH,
                200,
                json!({ "properties": { "observationStations": "http://api.weather.gov/gridpoints/TOP/31,80/stations?limit=5" } }),
            )
            .respond(STATIONS_PATH, 200, stations_body());
        let client = client(stub);

        client.observation_stations(39.7456, -97.0892).await.expect("stations");

        assert_eq!(client.transport().calls(), vec![POINTS_PATH, STATIONS_PATH]);
    }

    #[tokio::test]
    async fn current_weather_chains_three_requests() {
        let stub = StubTransport::default()
            .respond("/points/39.0693,-95.6245", 200, points_body())
            .respond(STATIONS_PATH, 200, stations_body())
            .respond(OBSERVATION_PATH, 200, observation_body());
        let client = client(stub);

        let response = client.current_weather(39.0693, -95.6245).await.expect("observation");

        let data = response.data().expect("data");
        assert_eq!(data["properties"]["temperature"]["value"], 22.8);
        assert_eq!(
            client.transport().calls(),
            vec!["/points/39.0693,-95.6245", STATIONS_PATH, OBSERVATION_PATH]
        );
    }

    #[tokio::test]
    async fn current_weather_without_stations() {
        let stub = StubTransport::default()
            .respond(POINTS_PATH, 200, points_body())
            .respond(STATIONS_PATH, 200, json!({ "features": [] }));
        let client = client(stub);

        let err = client.current_weather(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(err.to_string(), "No observation stations found");
        assert!(!client.transport().calls().iter().any(|c| c.starts_with("/stations/")));
    }

    #[tokio::test]
    async fn current_weather_without_station_identifier() {
        let stub = StubTransport::default()
            .respond(POINTS_PATH, 200, points_body())
            .respond(STATIONS_PATH, 200, json!({ "features": [ { "properties": {} } ] }));
        let client = client(stub);

        let err = client.current_weather(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test]
    async fn inner_faults_pass_through_unchanged() {
        let stub = StubTransport::default()
            .respond(POINTS_PATH, 200, points_body())
            .respond(STATIONS_PATH, 503, json!({ "title": "Service Unavailable", "status": 503 }));
        let client = client(stub);

        let err = client.current_weather(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_server_fault());
        assert_eq!(err.to_string(), "Service Unavailable");
        assert_eq!(err.problem().and_then(|p| p.status), Some(503));
    }

    #[tokio::test]
    async fn forecast_uses_grid_reference() {
        let stub = StubTransport::default()
            .respond(POINTS_PATH, 200, points_body())
            .respond(
                "/gridpoints/TOP/31,80/forecast",
                200,
                json!({ "properties": { "periods": [ { "number": 1, "temperature": 75 } ] } }),
            );
        let client = client(stub);

        let response = client.forecast(39.7456, -97.0892).await.expect("forecast");

        let data = response.data().expect("data");
        assert_eq!(data["properties"]["periods"][0]["temperature"], 75);
        assert_eq!(
            client.transport().calls(),
            vec![POINTS_PATH, "/gridpoints/TOP/31,80/forecast"]
        );
    }

    #[tokio::test]
    async fn forecast_hourly_uses_grid_reference() {
        let stub = StubTransport::default()
            .respond(POINTS_PATH, 200, points_body())
            .respond("/gridpoints/TOP/31,80/forecast/hourly", 200, json!({ "properties": { "periods": [] } }));
        let client = client(stub);

        client.forecast_hourly(39.7456, -97.0892).await.expect("hourly forecast");

        assert_eq!(
            client.transport().calls(),
            vec![POINTS_PATH, "/gridpoints/TOP/31,80/forecast/hourly"]
        );
    }

    #[tokio::test]
    async fn forecast_requires_grid_reference() {
        let stub = StubTransport::default().respond(
            POINTS_PATH,
            200,
            json!({ "properties": { "gridId": "TOP" } }),
        );
        let client = client(stub);

        let err = client.forecast(39.7456, -97.0892).await.unwrap_err();

        assert!(err.is_client_fault());
        assert_eq!(err.to_string(), "No grid reference found in points response");
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn latest_observation_rejects_odd_station_ids() {
        let client = client(StubTransport::default());

        for id in ["", "../points", "K TOP"] {
            let err = client.latest_observation(id).await.unwrap_err();
            assert!(err.is_client_fault());
        }
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn stations_link_is_relative_to_base_path() {
        let stub = StubTransport::default()
            .respond(
                POINTS_PATH,
                200,
                json!({ "properties": { "observationStations": "https://proxy.example.com/api/gridpoints/TOP/31,80/stations" } }),
            )
            .respond(STATIONS_PATH, 200, stations_body());
        let config = ClientConfig::default().with_base_url("https://proxy.example.com/api/");
        let client = WeatherGovClient::with_transport(config, stub).expect("client");

        client.observation_stations(39.7456, -97.0892).await.expect("stations");

        assert_eq!(client.transport().calls(), vec![POINTS_PATH, STATIONS_PATH]);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = ClientConfig::default().with_base_url("not a url");
        let err = WeatherGovClient::with_transport(config, StubTransport::default()).unwrap_err();
        assert!(matches!(err, WeatherGovError::InvalidConfig(_)));
    }
}
