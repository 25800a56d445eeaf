use reqwest::{Response, StatusCode};
use runway_core::client::{ClientError, ClientResult};
use serde::de::DeserializeOwned;

pub(crate) fn transport(e: reqwest::Error) -> ClientError {
    if e.is_decode() {
        ClientError::Decode(e.to_string())
    } else {
        ClientError::Transport(e.to_string())
    }
}

/// Pass successful responses through; map everything else onto [`ClientError`].
pub(crate) async fn check(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.bytes().await.map_err(transport)?;
    let message = error_message(&body);
    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Auth(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let body = resp.bytes().await.map_err(transport)?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// GitHub puts `message` at the top level; Nova nests it one level down
/// (`{"itemNotFound": {"message": ...}}`).
fn error_message(body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<serde_json::Value>(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("message").and_then(|m| m.as_str()).or_else(|| {
                v.as_object()?
                    .values()
                    .find_map(|inner| inner.get("message")?.as_str())
            })
        })
        .map(str::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::error_message;

    #[test]
    fn extracts_top_level_message() {
        assert_eq!(error_message(br#"{"message":"Bad credentials"}"#), "Bad credentials");
    }

    #[test]
    fn extracts_nested_message() {
        let body = br#"{"itemNotFound":{"message":"Instance could not be found.","code":404}}"#;
        assert_eq!(error_message(body), "Instance could not be found.");
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(error_message(b"upstream timeout\n"), "upstream timeout");
    }
}
