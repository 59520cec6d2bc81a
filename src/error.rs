use thiserror::Error;

/// Errors surfaced to the host through the bridge `error` callback.
/// The numeric codes and messages are part of the host contract and
/// must not change.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// No usable media capture backend or camera device.
    #[error("WebView does not support navigator.mediaDevices")]
    UnsupportedEnvironment,

    /// The pretrained landmark model failed to initialize.
    #[error("Unable to load model")]
    ModelLoadFailed,
}

impl BridgeError {
    pub fn code(&self) -> u16 {
        match self {
            BridgeError::UnsupportedEnvironment => 400,
            BridgeError::ModelLoadFailed => 401,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BridgeError::UnsupportedEnvironment => {
                "WebView does not support navigator.mediaDevices"
            }
            BridgeError::ModelLoadFailed => "Unable to load model",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_messages_match_host_contract() {
        assert_eq!(BridgeError::UnsupportedEnvironment.code(), 400);
        assert_eq!(
            BridgeError::UnsupportedEnvironment.message(),
            "WebView does not support navigator.mediaDevices"
        );
        assert_eq!(BridgeError::ModelLoadFailed.code(), 401);
        assert_eq!(BridgeError::ModelLoadFailed.message(), "Unable to load model");
    }

    #[test]
    fn display_matches_message() {
        assert_eq!(
            BridgeError::ModelLoadFailed.to_string(),
            BridgeError::ModelLoadFailed.message()
        );
    }
}
