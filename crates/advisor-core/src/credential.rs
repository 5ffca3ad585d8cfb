//! API Key Resolution

use crate::error::{AdvisorError, Result};

/// Environment variables consulted, in order, when no key is supplied
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Trailing characters shown when a key is displayed
const VISIBLE_SUFFIX: usize = 4;

/// Provider credential; never printed in full
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input and characters that cannot be sent
    /// in a request header
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(AdvisorError::MissingCredential);
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(AdvisorError::InvalidCredential(
                "API key contains whitespace or non-ASCII characters".into(),
            ));
        }
        Ok(Self(key))
    }

    /// User-supplied key first, then the environment
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        Self::resolve_with(explicit, |name| std::env::var(name).ok())
    }

    fn resolve_with(
        explicit: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
            return Self::new(key);
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find_map(|value| Self::new(value).ok())
            .ok_or(AdvisorError::MissingCredential)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey({})", self)
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys are ASCII, so byte slicing is safe
        if self.0.len() > VISIBLE_SUFFIX * 2 {
            write!(f, "****{}", &self.0[self.0.len() - VISIBLE_SUFFIX..])
        } else {
            f.write_str("****")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_wins() {
        let key = ApiKey::resolve_with(Some(" user-key "), |_| Some("env-key".into())).unwrap();
        assert_eq!(key.expose(), "user-key");
    }

    #[test]
    fn test_env_precedence() {
        let key = ApiKey::resolve_with(None, |name| match name {
            "GEMINI_API_KEY" => Some("gemini".into()),
            "API_KEY" => Some("generic".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(key.expose(), "gemini");

        let key = ApiKey::resolve_with(Some(""), |name| {
            (name == "API_KEY").then(|| "generic".to_string())
        })
        .unwrap();
        assert_eq!(key.expose(), "generic");
    }

    #[test]
    fn test_missing_key() {
        let err = ApiKey::resolve_with(None, |_| Some("   ".into())).unwrap_err();
        assert!(matches!(err, AdvisorError::MissingCredential));
    }

    #[test]
    fn test_redacted_output() {
        let key = ApiKey::new("AIzaSyExample1234").unwrap();
        assert_eq!(key.to_string(), "****1234");
        assert!(!format!("{:?}", key).contains("AIza"));
    }

    #[test]
    fn test_short_key_fully_masked() {
        assert_eq!(ApiKey::new("abcd").unwrap().to_string(), "****");
        assert_eq!(ApiKey::new("abcdefgh").unwrap().to_string(), "****");
        assert_eq!(ApiKey::new("abcdefghi").unwrap().to_string(), "****fghi");
        assert_eq!(format!("{:?}", ApiKey::new("bad").unwrap()), "ApiKey(****)");
    }

    #[test]
    fn test_header_unsafe_key_rejected() {
        for raw in ["AIza key", "AIza\u{7f}key", "AIzaキー", "line\nbreak"] {
            let err = ApiKey::new(raw).unwrap_err();
            assert!(matches!(err, AdvisorError::InvalidCredential(_)), "{raw:?}");
        }
        assert!(ApiKey::new("AIzaSy-Ab_12").is_ok());
    }
}
