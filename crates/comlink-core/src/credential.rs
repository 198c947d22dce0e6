use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("access token is empty")]
pub struct InvalidToken;

/// Holds the opaque access token used to authenticate with the platform.
///
/// Replaced wholesale on re-initialization; token issuance and refresh are
/// server-side concerns and never happen here.
#[derive(Clone)]
pub struct TokenCredential {
    token: String,
}

impl TokenCredential {
    pub fn new(token: &str) -> Result<Self, InvalidToken> {
        if token.is_empty() {
            return Err(InvalidToken);
        }
        Ok(Self { token: token.to_string() })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCredential").field("token", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        assert!(TokenCredential::new("").is_err());
    }

    #[test]
    fn token_round_trips() {
        let credential = TokenCredential::new("eyJhbGciOi").unwrap();
        assert_eq!(credential.token(), "eyJhbGciOi");
    }

    #[test]
    fn debug_output_redacts_token() {
        let credential = TokenCredential::new("secret-token").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-token"));
    }
}
