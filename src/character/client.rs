use serde::{Deserialize, Serialize};

use super::Character;
use crate::errors::ApiError;

/// Body of `POST /character/select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    pub character_id: String,
    pub character_type: String,
}

/// Response of `POST /character/select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectResponse {
    pub success: bool,
    #[serde(default)]
    pub character: Option<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Client for the character-selection endpoint.
pub struct CharacterClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
}

impl CharacterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: None,
        }
    }

    /// Attach the session's bearer token to requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Persist a character choice server-side and return the server's view of it.
    pub async fn select(
        &self,
        character_id: &str,
        character_type: &str,
    ) -> Result<Character, ApiError> {
        let body = SelectRequest {
            character_id: character_id.to_string(),
            character_type: character_type.to_string(),
        };

        let mut request = self
            .http
            .post(format!("{}/character/select", self.base_url))
            .json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Status {
                status: resp.status().as_u16(),
            });
        }

        let payload: SelectResponse = resp.json().await?;
        if !payload.success {
            return Err(ApiError::Rejected(
                payload
                    .message
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        payload.character.ok_or(ApiError::MissingCharacter)
    }
}
