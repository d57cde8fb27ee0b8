use serde_json::Value;
use std::sync::{Arc, OnceLock};

use crate::WeatherGovError;

/// One HTTP round trip: its status and its body, decoded as JSON on demand.
///
/// The body is parsed at most once; every call to [`ResponseEnvelope::data`]
/// observes the same outcome.
#[derive(Debug)]
pub struct ResponseEnvelope {
    status: u16,
    body: String,
    data: OnceLock<Result<Value, Arc<serde_json::Error>>>,
}

impl ResponseEnvelope {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            data: OnceLock::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Raw response text, exactly as received.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parsed JSON payload. A malformed body is a [`WeatherGovError::Decode`].
    pub fn data(&self) -> Result<&Value, WeatherGovError> {
        let parsed = self
            .data
            .get_or_init(|| serde_json::from_str(&self.body).map_err(Arc::new));

        parsed.as_ref().map_err(|e| WeatherGovError::Decode {
            status: self.status,
            source: Arc::clone(e),
        })
    }

    pub fn into_data(self) -> Result<Value, WeatherGovError> {
        let status = self.status;
        match self.data.into_inner() {
            Some(Ok(value)) => Ok(value),
            Some(Err(source)) => Err(WeatherGovError::Decode { status, source }),
            None => serde_json::from_str(&self.body).map_err(|e| WeatherGovError::decode(status, e)),
        }
    }
}
