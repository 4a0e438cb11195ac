//! Google ID token verification
//!
//! The credential from Google Identity Services is checked against Google's
//! `tokeninfo` endpoint; the audience must equal our `GOOGLE_CLIENT_ID`.

use serde::Deserialize;
use shared::ErrorCode;

use crate::AppError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verified identity extracted from a Google ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    /// Google sends "true"/"false" as strings
    email_verified: Option<String>,
    name: Option<String>,
}

pub async fn verify_id_token(
    client: &reqwest::Client,
    client_id: &str,
    credential: &str,
) -> Result<GoogleIdentity, AppError> {
    let response = client
        .get(TOKENINFO_URL)
        .query(&[("id_token", credential)])
        .send()
        .await
        .map_err(|e| AppError::with_message(ErrorCode::NetworkError, e.to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::new(ErrorCode::GoogleTokenInvalid));
    }

    let info: TokenInfo = response
        .json()
        .await
        .map_err(|_| AppError::new(ErrorCode::GoogleTokenInvalid))?;

    identity_from_token_info(info, client_id)
}

fn identity_from_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, AppError> {
    if info.aud != client_id {
        return Err(AppError::with_message(
            ErrorCode::GoogleTokenInvalid,
            "Token was issued for another application",
        ));
    }
    let verified = info.email_verified.as_deref() == Some("true");
    let email = match info.email {
        Some(email) if verified => email,
        _ => {
            return Err(AppError::with_message(
                ErrorCode::GoogleTokenInvalid,
                "Google account email is not verified",
            ));
        }
    };
    Ok(GoogleIdentity {
        sub: info.sub,
        email,
        name: info.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: &str) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            sub: "1234".into(),
            email: Some("ana@gmail.com".into()),
            email_verified: Some(verified.into()),
            name: Some("Ana".into()),
        }
    }

    #[test]
    fn test_accepts_matching_audience() {
        let identity = identity_from_token_info(info("my-app", "true"), "my-app").unwrap();
        assert_eq!(identity.sub, "1234");
        assert_eq!(identity.email, "ana@gmail.com");
    }

    #[test]
    fn test_rejects_foreign_audience() {
        let err = identity_from_token_info(info("other-app", "true"), "my-app").unwrap_err();
        assert_eq!(err.code, ErrorCode::GoogleTokenInvalid);
    }

    #[test]
    fn test_rejects_unverified_email() {
        let err = identity_from_token_info(info("my-app", "false"), "my-app").unwrap_err();
        assert_eq!(err.code, ErrorCode::GoogleTokenInvalid);
    }
}
