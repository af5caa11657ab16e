//! Interpreting responses of the service.

use error_stack::{IntoReport, ResultExt};
use serde::de::DeserializeOwned;

use crate::{Error, HttpResponse};

/// Message returned when a query has never been executed (with the given
/// parameters).
const NO_EXECUTION: &str = "not found: No execution found for the latest version of the given query";

/// Fragments of messages returned when results are requested before the
/// execution has finished.
const STILL_RUNNING: &[&str] = &[
    "still running",
    "currently executing",
    "not yet finished",
    "has not completed",
    "not completed yet",
    "is pending",
];

/// An error reported by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ServiceError {
    /// There is no execution to retrieve results from.
    NoExecution,
    /// The execution exists but has not finished.
    StillRunning(String),
    Other(String),
}

impl ServiceError {
    fn classify(message: String) -> Self {
        if message.trim() == NO_EXECUTION || message.starts_with("not found: No execution found") {
            return Self::NoExecution;
        }
        let lower = message.to_ascii_lowercase();
        if STILL_RUNNING.iter().any(|fragment| lower.contains(fragment)) {
            Self::StillRunning(message)
        } else {
            Self::Other(message)
        }
    }

    pub fn into_error(self) -> error_stack::Report<Error> {
        match self {
            Self::NoExecution => error_stack::report!(Error::Remote(NO_EXECUTION.to_owned())),
            Self::StillRunning(message) | Self::Other(message) => {
                error_stack::report!(Error::Remote(message))
            }
        }
    }
}

/// The error carried by a response, if it is a JSON error envelope.
///
/// Result text is not JSON (or not an object with an `error` field), so this
/// is `None` for successful result responses.
pub(crate) fn service_error(response: &HttpResponse) -> Option<ServiceError> {
    let trimmed = response.body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let message = match value.get("error")? {
        serde_json::Value::String(message) => message.clone(),
        serde_json::Value::Object(error) => match error.get("message") {
            Some(serde_json::Value::String(message)) => message.clone(),
            _ => value["error"].to_string(),
        },
        other => other.to_string(),
    };
    Some(ServiceError::classify(message))
}

/// Fail on anything other than a successful response without an error
/// envelope.
pub(crate) fn check_response(response: &HttpResponse) -> error_stack::Result<(), Error> {
    if let Some(error) = service_error(response) {
        return Err(error.into_error())
            .attach_printable_lazy(|| format!("status {}", response.status));
    }
    if !response.is_success() {
        return Err(error_stack::report!(Error::UnexpectedResponse(
            response.status
        )))
        .attach_printable_lazy(|| body_excerpt(&response.body));
    }
    Ok(())
}

/// Parse a successful JSON response.
pub(crate) fn parse_json<T: DeserializeOwned>(
    response: &HttpResponse,
) -> error_stack::Result<T, Error> {
    check_response(response)?;
    serde_json::from_str(&response.body)
        .into_report()
        .change_context(Error::UnexpectedResponse(response.status))
        .attach_printable_lazy(|| body_excerpt(&response.body))
}

fn body_excerpt(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let mut excerpt: String = body.chars().take(MAX_CHARS).collect();
    if body.chars().nth(MAX_CHARS).is_some() {
        excerpt.push_str("...");
    }
    format!("body: {excerpt}")
}
