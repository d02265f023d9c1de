//! JSON body extractor that insists on a non-empty object.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::http::error::AppError;
use crate::state::AppState;

const EMPTY_BODY: &str = "Empty or invalid request body";

/// A request body that decoded to a JSON object with at least one key.
pub struct JsonObject(pub Map<String, Value>);

impl JsonObject {
    /// Decode the object into a typed payload.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| AppError::MalformedRequest(format!("Invalid request body: {e}")))
    }
}

impl FromRequest<AppState> for JsonObject {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::MalformedRequest(format!("Invalid JSON: {e}")))?;

        parse_object(&bytes).map(JsonObject)
    }
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::MalformedRequest(EMPTY_BODY.to_string()));
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::MalformedRequest(format!("Invalid JSON: {e}")))?;

    match value {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(AppError::MalformedRequest(EMPTY_BODY.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        match err {
            AppError::MalformedRequest(msg) => msg,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_non_empty_object() {
        let map = parse_object(br#"{"name": "Review"}"#).unwrap();
        assert_eq!(map["name"], "Review");
    }

    #[test]
    fn rejects_empty_inputs() {
        let bodies: [&[u8]; 6] = [b"", b"   ", b"{}", b"[]", b"null", b"42"];
        for body in bodies {
            let msg = message(parse_object(body).unwrap_err());
            assert_eq!(msg, EMPTY_BODY, "body {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let msg = message(parse_object(b"{\"name\": ").unwrap_err());
        assert!(msg.starts_with("Invalid JSON: "), "{msg}");
    }

    #[test]
    fn decode_reports_type_errors() {
        let obj = JsonObject(parse_object(br#"{"name": 5, "entityType": "Risk"}"#).unwrap());
        let err = obj
            .decode::<stepwright_types::workflow::NewWorkflowRequest>()
            .unwrap_err();
        assert!(message(err).starts_with("Invalid request body"));
    }
}
