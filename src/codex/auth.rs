//! Codex `auth.json` parsing and plan detection from ChatGPT tokens.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use super::plan::Plan;
use super::CodexError;

/// Claim namespace carrying the ChatGPT plan.
const OPENAI_AUTH_CLAIM: &str = "https://api.openai.com/auth";

/// Contents of `~/.codex/auth.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthFile {
    #[serde(default)]
    pub auth_mode: String,
    #[serde(rename = "OPENAI_API_KEY", default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub tokens: Tokens,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tokens {
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub access_token: String,
}

impl AuthFile {
    /// Read the auth file. `Ok(None)` when it does not exist or is unreadable.
    pub fn load(path: &Path) -> Result<Option<Self>, CodexError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Codex auth file {} not readable: {}", path.display(), e);
                return Ok(None);
            }
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(CodexError::InvalidAuthFile)
    }

    /// Trimmed API key stored in the file, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Plan from the id token, falling back to the access token.
    pub fn token_plan(&self) -> Plan {
        [&self.tokens.id_token, &self.tokens.access_token]
            .into_iter()
            .filter(|token| !token.is_empty())
            .find_map(|token| plan_from_token(token).ok())
            .unwrap_or(Plan::Unknown)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Claims {
    #[serde(rename = "https://api.openai.com/auth", default)]
    openai_auth: OpenAiAuth,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiAuth {
    #[serde(default)]
    chatgpt_plan_type: String,
}

/// Extract the plan from a JWT's payload without verifying the signature.
pub fn plan_from_token(token: &str) -> Result<Plan, CodexError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| CodexError::InvalidToken("missing payload segment".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CodexError::InvalidToken(format!("invalid payload encoding: {}", e)))?;

    let claims: Claims = serde_json::from_slice(&bytes).map_err(|e| {
        CodexError::InvalidToken(format!("invalid {} claims: {}", OPENAI_AUTH_CLAIM, e))
    })?;

    Ok(Plan::normalize(&claims.openai_auth.chatgpt_plan_type))
}

#[cfg(test)]
pub(crate) fn make_jwt(payload: &serde_json::Value) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
    format!("header.{}.signature", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_token(plan: &str) -> String {
        make_jwt(&json!({"https://api.openai.com/auth": {"chatgpt_plan_type": plan}}))
    }

    #[test]
    fn test_plan_from_token() {
        assert_eq!(plan_from_token(&plan_token("pro")).unwrap(), Plan::Pro);
    }

    #[test]
    fn test_plan_from_token_without_claim_is_unknown() {
        let token = make_jwt(&json!({"sub": "user"}));
        assert_eq!(plan_from_token(&token).unwrap(), Plan::Unknown);
    }

    #[test]
    fn test_plan_from_token_rejects_garbage() {
        assert!(plan_from_token("not-a-jwt").is_err());
        assert!(plan_from_token("a.!!!.c").is_err());
    }

    #[test]
    fn test_token_plan_falls_back_to_access_token() {
        let auth = AuthFile {
            tokens: Tokens {
                id_token: "garbage".to_string(),
                access_token: plan_token("team"),
            },
            ..Default::default()
        };
        assert_eq!(auth.token_plan(), Plan::Team);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = AuthFile::load(&dir.path().join("auth.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AuthFile::load(&path),
            Err(CodexError::InvalidAuthFile(_))
        ));
    }

    #[test]
    fn test_api_key_trimmed() {
        let auth: AuthFile =
            serde_json::from_str(r#"{"auth_mode":"api_key","OPENAI_API_KEY":"  sk-1 "}"#).unwrap();
        assert_eq!(auth.api_key(), Some("sk-1"));

        let auth: AuthFile = serde_json::from_str(r#"{"OPENAI_API_KEY":null}"#).unwrap();
        assert_eq!(auth.api_key(), None);
    }
}
