use log::trace;
use serde_json::{Map, Value};

use crate::util::error::HubError;

const UNAUTHORIZED_USER: &str = "unauthorized user";
const LINK_BUTTON_NOT_PRESSED: &str = "link button not pressed";

/// A successfully classified hub response.
///
/// The hub answers resource reads with a keyed map and mutations with a list of
/// `{"success": ...}` entries.
#[derive(Debug, Clone, PartialEq)]
pub enum HubResponse {
    /// A keyed map, as returned by `GET` on a resource.
    Resource(Map<String, Value>),
    /// The contents of each `success` entry, in the order the hub returned them.
    Success(Vec<Value>),
}

impl HubResponse {
    pub fn into_resource(self) -> Result<Map<String, Value>, HubError> {
        match self {
            HubResponse::Resource(map) => Ok(map),
            HubResponse::Success(_) => Err(HubError::MalformedResponse(
                "expected a resource map, got a result list".to_string(),
            )),
        }
    }

    pub fn into_success(self) -> Result<Vec<Value>, HubError> {
        match self {
            HubResponse::Success(entries) => Ok(entries),
            HubResponse::Resource(_) => Err(HubError::MalformedResponse(
                "expected a result list, got a resource map".to_string(),
            )),
        }
    }
}

/// Classifies a raw response body.
///
/// An error entry anywhere in a result list takes precedence over success entries, so a
/// partially rejected mutation is reported as a failure.
pub fn classify_response(body: &str) -> Result<HubResponse, HubError> {
    trace!("  -> {}", body);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| HubError::MalformedResponse(format!("body is not JSON: {}", e)))?;
    classify_value(value)
}

pub fn classify_value(value: Value) -> Result<HubResponse, HubError> {
    match value {
        Value::Object(map) => Ok(HubResponse::Resource(map)),
        Value::Array(entries) => classify_entries(entries),
        other => Err(HubError::MalformedResponse(format!(
            "unexpected payload: {}",
            other
        ))),
    }
}

fn classify_entries(entries: Vec<Value>) -> Result<HubResponse, HubError> {
    if entries.is_empty() {
        return Err(HubError::MalformedResponse(
            "empty result list".to_string(),
        ));
    }

    if let Some(error) = entries.iter().find_map(|entry| entry.get("error")) {
        return Err(error_from_entry(error));
    }

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(mut map) => map.remove("success").ok_or_else(|| {
                HubError::MalformedResponse(format!(
                    "result entry has neither success nor error: {}",
                    Value::Object(map)
                ))
            }),
            other => Err(HubError::MalformedResponse(format!(
                "result entry is not an object: {}",
                other
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(HubResponse::Success)
}

fn error_from_entry(error: &Value) -> HubError {
    let description = error
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    match description {
        UNAUTHORIZED_USER => HubError::Unauthorized,
        LINK_BUTTON_NOT_PRESSED => HubError::LinkButtonPending,
        _ => HubError::Hub {
            kind: error.get("type").and_then(Value::as_i64).unwrap_or(-1),
            description: description.to_string(),
        },
    }
}
