//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.

use crate::auth::message::ChallengeMessage;
use serde::{Deserialize, Serialize};

// ============================================================================
// Login Models
// ============================================================================

/// Query string for `GET /login`.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub address: Option<String>,
    #[serde(rename = "chainId")]
    pub chain_id: Option<String>,
}

/// Challenge handed to the client for signing.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub payload: ChallengeMessage,
}

/// Body of `POST /login`: the challenge as issued plus the wallet signature.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedLoginRequest {
    /// 65-byte `r || s || v` signature, hex (`0x` optional) or base64.
    pub signature: String,
    pub payload: ChallengeMessage,
}

/// Boolean outcome used by login, session and logout endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultResponse {
    pub result: bool,
}

impl ResultResponse {
    pub fn new(result: bool) -> Self {
        Self { result }
    }
}

// ============================================================================
// Session Models
// ============================================================================

/// Details of the caller's active session.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub address: String,
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_query_field_names() {
        let query: LoginQuery =
            serde_json::from_str(r#"{"address":"0xabc","chainId":"137"}"#).unwrap();
        assert_eq!(query.address.as_deref(), Some("0xabc"));
        assert_eq!(query.chain_id.as_deref(), Some("137"));

        let empty: LoginQuery = serde_json::from_str("{}").unwrap();
        assert!(empty.address.is_none());
        assert!(empty.chain_id.is_none());
    }

    #[test]
    fn test_signed_login_request_requires_payload() {
        let err = serde_json::from_str::<SignedLoginRequest>(r#"{"signature":"0x00"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_session_info_field_names() {
        let info = SessionInfo {
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
            chain_id: "1".to_string(),
            expires_at: 1_714_600_000,
        };
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["chainId"], "1");
        assert_eq!(json["expiresAt"], 1_714_600_000);
    }
}
