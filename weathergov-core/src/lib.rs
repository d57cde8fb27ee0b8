//! Client library for the api.weather.gov web service.
//!
//! This crate defines:
//! - A client for the points, observation stations, latest observation and
//!   forecast endpoints
//! - The error taxonomy those calls fail with (client, server, network faults)
//! - Configuration, both in-memory and persisted for the `weathergov` CLI
//!
//! It is used by `weathergov-cli`, but can also be reused by other binaries or services.
//!
//! ```no_run
//! # async fn run() -> Result<(), weathergov_core::WeatherGovError> {
//! use weathergov_core::{ClientConfig, Observation, WeatherGovClient};
//!
//! let client = WeatherGovClient::new(
//!     ClientConfig::default().with_user_agent("my-app (me@example.com)"),
//! )?;
//! let response = client.current_weather(39.0693, -95.6245).await?;
//! let observation = Observation::from_envelope(&response)?;
//! println!("{:?}", observation.temperature);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod response;
pub mod transport;

pub use client::WeatherGovClient;
pub use config::{ClientConfig, Config};
pub use error::{CoordinateError, Fault, FaultKind, ProblemDetail, WeatherGovError};
pub use model::{Coordinate, Forecast, ForecastPeriod, GridReference, Measurement, Observation};
pub use response::ResponseEnvelope;
pub use transport::{HttpTransport, RawResponse, Transport, TransportError, TransportErrorKind};
