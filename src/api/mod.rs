//! Wire payloads shared by the relay endpoint and its clients.

use serde::{Deserialize, Serialize};

/// One conversation entry as it travels over the wire. Attachments and
/// client-side metadata are deliberately stripped before transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST /api/chat`.
///
/// `apiKey` and `model` default to empty strings so that an absent field and
/// an empty field take the same validation path (a 400, not a decode error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

/// JSON body returned by the relay on validation and backend failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_request_accepts_missing_credentials() {
        let req: RelayRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hi"}]}"#)
                .expect("body should decode without apiKey/model");
        assert_eq!(req.api_key, "");
        assert_eq!(req.model, "");
        assert_eq!(req.messages.len(), 1);
    }

    #[test]
    fn relay_request_uses_camel_case_api_key() {
        let req: RelayRequest = serde_json::from_str(
            r#"{"messages": [], "apiKey": "hf_123", "model": "gpt2"}"#,
        )
        .expect("body should decode");
        assert_eq!(req.api_key, "hf_123");
        assert_eq!(req.model, "gpt2");
    }

    #[test]
    fn error_body_omits_absent_details() {
        let body = RelayErrorBody {
            error: "API key and model are required".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert!(!json.contains("details"));
    }
}
