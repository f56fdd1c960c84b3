use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

/// Failure of a single remote call. Everything except
/// [`RemoteError::InvalidLanguagePair`] is recoverable per chunk.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote rejected the language pair")]
    InvalidLanguagePair,

    #[error("translation endpoint returned status {0}")]
    Http(u16),

    #[error("malformed translation response")]
    MalformedResponse,

    #[error("transport failure: {0}")]
    Transport(String),
}

pub type RemoteFuture = Pin<Box<dyn Future<Output = Result<String, RemoteError>> + Send>>;

/// One translation-API unit: a single chunk with a `source|target` pair.
pub trait RemoteTranslator: Send + Sync {
    fn translate_chunk(&self, text: &str, source_lang: &str, target_lang: &str) -> RemoteFuture;
}

/// MyMemory-style GET client: `?q=<chunk>&langpair=src|tgt`.
#[derive(Debug, Clone)]
pub struct MyMemory {
    http: reqwest::Client,
    endpoint: String,
}

impl MyMemory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for MyMemory {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    response_data: Option<ResponseData>,
    response_status: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    translated_text: Option<String>,
}

/// The endpoint reports an unsupported pair as a 403 body status, sometimes
/// as a number and sometimes as a string.
fn is_invalid_pair_status(status: Option<&Value>) -> bool {
    match status {
        Some(Value::Number(n)) => n.as_i64() == Some(403),
        Some(Value::String(s)) => s == "403",
        _ => false,
    }
}

impl RemoteTranslator for MyMemory {
    fn translate_chunk(&self, text: &str, source_lang: &str, target_lang: &str) -> RemoteFuture {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let text = text.to_string();
        let pair = format!("{source_lang}|{target_lang}");
        Box::pin(async move {
            let response = http
                .get(&endpoint)
                .query(&[("q", text.as_str()), ("langpair", pair.as_str())])
                .send()
                .await
                .map_err(|err| RemoteError::Transport(err.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RemoteError::Http(status.as_u16()));
            }

            let body: ApiResponse = response
                .json()
                .await
                .map_err(|_| RemoteError::MalformedResponse)?;

            if let Some(translated) = body
                .response_data
                .as_ref()
                .and_then(|data| data.translated_text.clone())
            {
                return Ok(translated);
            }
            if is_invalid_pair_status(body.response_status.as_ref()) {
                return Err(RemoteError::InvalidLanguagePair);
            }
            Err(RemoteError::MalformedResponse)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{is_invalid_pair_status, ApiResponse};
    use serde_json::json;

    #[test]
    fn parses_success_body() {
        let body: ApiResponse = serde_json::from_value(json!({
            "responseData": { "translatedText": "hola. adios." },
            "responseStatus": 200
        }))
        .unwrap();
        assert_eq!(
            body.response_data.unwrap().translated_text.as_deref(),
            Some("hola. adios.")
        );
    }

    #[test]
    fn recognizes_invalid_pair_as_number_or_string() {
        assert!(is_invalid_pair_status(Some(&json!(403))));
        assert!(is_invalid_pair_status(Some(&json!("403"))));
        assert!(!is_invalid_pair_status(Some(&json!(200))));
        assert!(!is_invalid_pair_status(Some(&json!("200"))));
        assert!(!is_invalid_pair_status(None));
    }

    #[test]
    fn tolerates_missing_fields() {
        let body: ApiResponse = serde_json::from_value(json!({ "responseStatus": "403" })).unwrap();
        assert!(body.response_data.is_none());
        assert!(is_invalid_pair_status(body.response_status.as_ref()));
    }
}
