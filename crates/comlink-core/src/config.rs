use serde::{Deserialize, Serialize};

/// Runtime policy for the session managers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Accept pushed incoming calls automatically.
    #[serde(default = "default_true")]
    pub auto_accept_incoming: bool,
    /// Attach a camera preview when accepting an incoming call.
    /// Preview acquisition is best effort; acceptance proceeds without it.
    #[serde(default = "default_true")]
    pub preview_on_accept: bool,
    /// Page size used by message listing when the caller does not give one.
    #[serde(default = "default_chat_page_size")]
    pub chat_page_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_chat_page_size() -> u32 {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_accept_incoming: true,
            preview_on_accept: true,
            chat_page_size: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert!(config.auto_accept_incoming);
        assert!(config.preview_on_accept);
        assert_eq!(config.chat_page_size, 20);
    }

    #[test]
    fn partial_json_uses_serde_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"auto_accept_incoming": false}"#).unwrap();
        assert!(!config.auto_accept_incoming);
        assert!(config.preview_on_accept);
        assert_eq!(config.chat_page_size, 20);
    }

    #[test]
    fn round_trips_through_json() {
        let config = SessionConfig {
            auto_accept_incoming: false,
            preview_on_accept: false,
            chat_page_size: 50,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<SessionConfig>(&json).unwrap(), config);
    }
}
