//! Response normalization.
//!
//! Every JSON reply is handed back as a `serde_json::Value` exactly as the
//! server sent it, error bodies included. Only a body that is not JSON at
//! all becomes an error, and that error keeps the HTTP status.

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AptlyError, ResponseError, Result};
use crate::http::HttpResponse;

/// Outcome of every JSON call made through the client.
pub type ApiResult = Result<Value>;

/// Parse `response` into a JSON value, or describe why it could not be.
pub fn normalize(response: &HttpResponse, context: Option<&str>) -> ApiResult {
    serde_json::from_slice(&response.body).map_err(|err| {
        let context = context.unwrap_or(ResponseError::DEFAULT_CONTEXT);
        warn!(
            "{context}: HTTP {} body ({} bytes) is not JSON: {err}",
            response.status,
            response.body.len()
        );
        AptlyError::UnparseableResponse(ResponseError {
            context: context.to_string(),
            status: response.status,
            reason: err.to_string(),
        })
    })
}

/// Convert a normalized value into one of the typed response models.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(AptlyError::Decode)
}
