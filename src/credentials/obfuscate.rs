//! Reversible at-rest encoding and display masking for API keys.

use super::CredentialError;
use base64::{Engine as _, engine::general_purpose::STANDARD};

pub(crate) fn encode(key: &str) -> String {
    STANDARD.encode(key.as_bytes())
}

pub(crate) fn decode(encoded: &str) -> Result<String, CredentialError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|error| CredentialError::Corrupt(format!("stored key is not base64: {error}")))?;
    String::from_utf8(bytes)
        .map_err(|_| CredentialError::Corrupt("stored key is not valid UTF-8".into()))
}

/// Show the first and last four characters of a key; short keys are hidden entirely.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_and_short_keys() {
        assert_eq!(mask_key("sk-test"), "****");
        assert_eq!(mask_key("12345678"), "****");
        assert_eq!(mask_key("AIzaSyD-example-XYZ9"), "AIza...XYZ9");
    }

    #[test]
    fn encoding_is_reversible() {
        let encoded = encode("gsk-secret");
        assert_ne!(encoded, "gsk-secret");
        assert_eq!(decode(&encoded).expect("decode"), "gsk-secret");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode("***"), Err(CredentialError::Corrupt(_))));
    }
}
