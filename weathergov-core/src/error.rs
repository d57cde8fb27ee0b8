//! Error taxonomy shared by every client operation.
//!
//! Every failure reaches the caller as exactly one [`WeatherGovError`]:
//! a precondition failure (bad coordinate, bad configuration) that never
//! touches the network, or one of the client/server/network faults produced
//! by [`crate::classify`] and by the client's own payload checks.

use std::{fmt, sync::Arc};

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// Message used when an error body carries neither a title nor a detail.
pub const DEFAULT_FAULT_MESSAGE: &str = "API request failed";

/// Coarse category of a [`WeatherGovError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Rejected before any request was issued.
    Precondition,
    /// The upstream answered 4xx, or its payload was structurally unusable.
    Client,
    /// The upstream answered 5xx, or broke its response contract.
    Server,
    /// The transport never completed.
    Network,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Precondition => "precondition",
            FaultKind::Client => "client",
            FaultKind::Server => "server",
            FaultKind::Network => "network",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair outside the range the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is out of range; expected a value between -90 and 90")]
    Latitude(f64),

    #[error("longitude {0} is out of range; expected a value between -180 and 180")]
    Longitude(f64),
}

/// One entry of a problem document's `parameterErrors` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterError {
    pub parameter: Option<String>,
    pub message: Option<String>,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.parameter, &self.message) {
            (Some(parameter), Some(message)) => write!(f, "{parameter}: {message}"),
            (Some(parameter), None) => f.write_str(parameter),
            (None, Some(message)) => f.write_str(message),
            (None, None) => Ok(()),
        }
    }
}

/// RFC 7807 problem document returned by weather.gov on failure.
///
/// Every field is optional. Extraction is best-effort: a field that is
/// missing or carries an unexpected JSON type is left as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemDetail {
    /// The `type` URI, e.g. `https://api.weather.gov/problems/InvalidPoint`.
    pub problem_type: Option<String>,
    pub title: Option<String>,
    pub status: Option<i64>,
    pub detail: Option<String>,
    pub instance: Option<String>,
    pub correlation_id: Option<String>,
    pub parameter_errors: Vec<ParameterError>,
}

impl ProblemDetail {
    /// Read whatever problem fields are present in a decoded error body.
    pub fn from_value(body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);

        let parameter_errors = body
            .get("parameterErrors")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| ParameterError {
                        parameter: entry
                            .get("parameter")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                        message: entry.get("message").and_then(Value::as_str).map(str::to_owned),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            problem_type: text("type"),
            title: text("title"),
            status: body.get("status").and_then(Value::as_i64),
            detail: text("detail"),
            instance: text("instance"),
            correlation_id: text("correlationId"),
            parameter_errors,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Comma-joined summary of the fields that are present.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(problem_type) = &self.problem_type {
            parts.push(format!("Type: {problem_type}"));
        }
        if let Some(title) = &self.title {
            parts.push(format!("Title: {title}"));
        }
        if let Some(status) = self.status {
            parts.push(format!("Status: {status}"));
        }
        if let Some(detail) = &self.detail {
            parts.push(format!("Detail: {detail}"));
        }
        if let Some(instance) = &self.instance {
            parts.push(format!("Instance: {instance}"));
        }
        if let Some(correlation_id) = &self.correlation_id {
            parts.push(format!("CorrelationID: {correlation_id}"));
        }
        if !self.parameter_errors.is_empty() {
            let joined = self
                .parameter_errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            parts.push(format!("ParameterErrors: {joined}"));
        }
        parts.join(", ")
    }
}

/// Payload of the client, server and network variants of [`WeatherGovError`].
#[derive(Debug)]
pub struct Fault {
    message: String,
    problem: Option<ProblemDetail>,
    source: Option<TransportError>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            problem: None,
            source: None,
        }
    }

    /// Build a fault from a problem document.
    ///
    /// The message is the override if given, else the title, else the
    /// detail, else [`DEFAULT_FAULT_MESSAGE`].
    pub fn from_problem(problem: ProblemDetail, message_override: Option<String>) -> Self {
        let message = message_override
            .or_else(|| problem.title.clone())
            .or_else(|| problem.detail.clone())
            .unwrap_or_else(|| DEFAULT_FAULT_MESSAGE.to_string());

        Self {
            message,
            problem: Some(problem),
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, source: TransportError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn problem(&self) -> Option<&ProblemDetail> {
        self.problem.as_ref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            return f.write_str(&self.message);
        }

        // An empty title wins the message precedence, so fall back to the fields.
        match &self.problem {
            Some(problem) => f.write_str(&problem.summary()),
            None => Ok(()),
        }
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The single error type returned by [`crate::WeatherGovClient`].
#[derive(Debug, Error)]
pub enum WeatherGovError {
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Client(Fault),

    #[error("{0}")]
    Server(Fault),

    /// A successful response whose body is not the JSON it should be.
    #[error("API response with status {status} could not be decoded: {source}")]
    Decode {
        status: u16,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("{0}")]
    Network(Fault),
}

impl WeatherGovError {
    pub(crate) fn client(message: impl Into<String>) -> Self {
        WeatherGovError::Client(Fault::new(message))
    }

    pub(crate) fn decode(status: u16, source: serde_json::Error) -> Self {
        WeatherGovError::Decode {
            status,
            source: Arc::new(source),
        }
    }

    /// Category of this error. Decode failures count as server faults.
    pub fn kind(&self) -> FaultKind {
        match self {
            WeatherGovError::InvalidCoordinate(_) | WeatherGovError::InvalidConfig(_) => {
                FaultKind::Precondition
            }
            WeatherGovError::Client(_) => FaultKind::Client,
            WeatherGovError::Server(_) | WeatherGovError::Decode { .. } => FaultKind::Server,
            WeatherGovError::Network(_) => FaultKind::Network,
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            WeatherGovError::Client(fault)
            | WeatherGovError::Server(fault)
            | WeatherGovError::Network(fault) => Some(fault),
            _ => None,
        }
    }

    /// Structured problem document, when the upstream sent a parsable one.
    pub fn problem(&self) -> Option<&ProblemDetail> {
        self.fault().and_then(Fault::problem)
    }

    pub fn is_client_fault(&self) -> bool {
        self.kind() == FaultKind::Client
    }

    pub fn is_server_fault(&self) -> bool {
        self.kind() == FaultKind::Server
    }

    pub fn is_network_fault(&self) -> bool {
        self.kind() == FaultKind::Network
    }
}
