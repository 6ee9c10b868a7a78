//! Provider type tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of LLM provider backend.
///
/// A closed set: resolution matches exhaustively over these variants, so
/// adding a provider is a compile-time-checked decision. The configured tag
/// is stored as a raw string and parsed with [`FromStr`], which is where an
/// unrecognized tag surfaces as an error naming the unknown value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::OpenAi => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ProviderType::Gemini),
            "openai" => Ok(ProviderType::OpenAi),
            other => Err(format!("invalid provider type: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_roundtrip() {
        for pt in [ProviderType::Gemini, ProviderType::OpenAi] {
            let s = pt.to_string();
            let parsed: ProviderType = s.parse().unwrap();
            assert_eq!(pt, parsed);
        }
    }

    #[test]
    fn test_provider_type_serde() {
        let pt = ProviderType::OpenAi;
        let json = serde_json::to_string(&pt).unwrap();
        assert_eq!(json, "\"openai\"");
        let parsed: ProviderType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ProviderType::OpenAi);
    }

    #[test]
    fn test_provider_type_parse_is_case_insensitive() {
        let parsed: ProviderType = "Gemini".parse().unwrap();
        assert_eq!(parsed, ProviderType::Gemini);
    }

    #[test]
    fn test_unknown_provider_type_names_the_tag() {
        let err = ProviderType::from_str("grok").unwrap_err();
        assert!(err.contains("grok"));
    }
}
