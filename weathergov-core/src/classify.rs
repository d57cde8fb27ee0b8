//! Turns a failed request into a [`WeatherGovError`].
//!
//! Two things can go wrong with a request: the transport never completes,
//! or the service answers with a non-2xx status. [`classify`] maps either
//! onto the client/server/network taxonomy. It is only called once the
//! caller knows the outcome is a failure, and it always yields an error.

use crate::{
    error::{Fault, ProblemDetail, WeatherGovError},
    response::ResponseEnvelope,
    transport::{TransportError, TransportErrorKind},
};

/// What happened to a request that did not succeed.
#[derive(Debug)]
pub enum Outcome<'a> {
    /// The request never produced a response.
    Transport(TransportError),
    /// The service answered, but not with a 2xx status.
    Response(&'a ResponseEnvelope),
}

pub fn classify(outcome: Outcome<'_>) -> WeatherGovError {
    let err = match outcome {
        Outcome::Transport(err) => classify_transport(err),
        Outcome::Response(envelope) => classify_response(envelope),
    };

    tracing::debug!(kind = %err.kind(), error = %err, "weather.gov request failed");
    err
}

fn classify_transport(err: TransportError) -> WeatherGovError {
    let fault = Fault::new(format!("API request failed: {}", err.message()));
    let kind = err.kind();
    let fault = fault.with_source(err);

    match kind {
        TransportErrorKind::Timeout | TransportErrorKind::Connection => {
            WeatherGovError::Network(fault)
        }
        TransportErrorKind::Other => WeatherGovError::Server(fault),
    }
}

fn classify_response(envelope: &ResponseEnvelope) -> WeatherGovError {
    let status = envelope.status();

    let fault = match envelope.data() {
        Ok(body) => Fault::from_problem(ProblemDetail::from_value(body), None),
        Err(_) => Fault::new(format!(
            "API request failed with status {status} but could not parse error response."
        )),
    };

    match status {
        400..=499 => WeatherGovError::Client(fault),
        // 5xx, and anything else that is not a success.
        _ => WeatherGovError::Server(fault),
    }
}
