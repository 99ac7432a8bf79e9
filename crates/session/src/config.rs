//! Runtime settings.
//!
//! Defaults first, then an optional JSON document, then `TOPICFORGE_*`
//! environment variables on top.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use topicforge_ai::MIN_TRANSCRIPT_CHARS;
use topicforge_conversation::ReadinessPolicy;
use topicforge_core::DomainError;
use topicforge_observability::{LogFormat, LoggingConfig};
use topicforge_recommendations::RecommendationPolicy;

pub const ENV_CACHE_TTL_SECS: &str = "TOPICFORGE_CACHE_TTL_SECS";
pub const ENV_RECOMMENDATION_LIMIT: &str = "TOPICFORGE_RECOMMENDATION_LIMIT";
pub const ENV_POPULAR_LIMIT: &str = "TOPICFORGE_POPULAR_LIMIT";
pub const ENV_MIN_USER_CHARS: &str = "TOPICFORGE_MIN_USER_CHARS";
pub const ENV_MIN_KEYWORD_HITS: &str = "TOPICFORGE_MIN_KEYWORD_HITS";
pub const ENV_LOG_FORMAT: &str = "TOPICFORGE_LOG_FORMAT";
pub const ENV_LOG_FILTER: &str = "TOPICFORGE_LOG_FILTER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed settings document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid settings: {0}")]
    Invalid(#[from] DomainError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recommendations: RecommendationPolicy,
    pub readiness: ReadinessPolicy,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TOPICFORGE_*` overrides read through `lookup`.
    pub fn with_overrides<L>(mut self, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, ENV_CACHE_TTL_SECS)? {
            self.recommendations.ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_RECOMMENDATION_LIMIT)? {
            self.recommendations.limit = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_POPULAR_LIMIT)? {
            self.recommendations.popular_limit = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MIN_USER_CHARS)? {
            self.readiness.min_user_chars = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MIN_KEYWORD_HITS)? {
            self.readiness.min_keyword_hits = v;
        }
        if let Some(v) = parse_var::<LogFormat, _>(&lookup, ENV_LOG_FORMAT)? {
            self.logging.format = v;
        }
        if let Some(v) = lookup(ENV_LOG_FILTER).filter(|v| !v.trim().is_empty()) {
            self.logging.filter = v;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.recommendations.validate()?;
        self.readiness.validate()?;
        // A ready conversation must always be long enough to generate from.
        if self.readiness.min_user_chars < MIN_TRANSCRIPT_CHARS {
            return Err(ConfigError::InvalidValue {
                key: "readiness.min_user_chars",
                value: self.readiness.min_user_chars.to_string(),
                reason: format!("must be at least {MIN_TRANSCRIPT_CHARS}, the generation minimum"),
            });
        }
        Ok(())
    }
}

fn parse_var<T, L>(lookup: &L, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_policy() {
        let settings = Settings::default();
        assert_eq!(settings.recommendations.ttl_secs, 120);
        assert_eq!(settings.recommendations.limit, 20);
        assert_eq!(settings.recommendations.popular_limit, 10);
        assert_eq!(settings.readiness.min_user_chars, 200);
        assert_eq!(settings.readiness.min_keyword_hits, 4);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn env_overrides_are_applied() {
        let settings = Settings::default()
            .with_overrides(env(&[
                (ENV_CACHE_TTL_SECS, "30"),
                (ENV_MIN_KEYWORD_HITS, " 2 "),
                (ENV_LOG_FORMAT, "pretty"),
                (ENV_LOG_FILTER, "topicforge=debug"),
            ]))
            .unwrap();

        assert_eq!(settings.recommendations.ttl_secs, 30);
        assert_eq!(settings.readiness.min_keyword_hits, 2);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert_eq!(settings.logging.filter, "topicforge=debug");
        assert_eq!(settings.recommendations.limit, 20);
    }

    #[test]
    fn malformed_env_value_names_the_variable() {
        let err = Settings::default()
            .with_overrides(env(&[(ENV_POPULAR_LIMIT, "ten")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, ENV_POPULAR_LIMIT);
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = Settings::default()
            .with_overrides(env(&[(ENV_CACHE_TTL_SECS, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn readiness_below_generation_minimum_is_rejected() {
        let err = Settings::default()
            .with_overrides(env(&[(ENV_MIN_USER_CHARS, "99")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "readiness.min_user_chars");
                assert_eq!(value, "99");
            }
            other => panic!("unexpected error: {other}"),
        }

        let at_minimum = Settings::default()
            .with_overrides(env(&[(ENV_MIN_USER_CHARS, "100")]))
            .unwrap();
        assert_eq!(at_minimum.readiness.min_user_chars, 100);
        assert!(Settings::from_json_str(r#"{ "readiness": { "min_user_chars": 20 } }"#).is_err());
    }

    #[test]
    fn partial_json_document_keeps_defaults() {
        let settings = Settings::from_json_str(
            r#"{ "recommendations": { "ttl_secs": 60 }, "readiness": { "min_user_chars": 150 } }"#,
        )
        .unwrap();

        assert_eq!(settings.recommendations.ttl_secs, 60);
        assert_eq!(settings.recommendations.popular_limit, 10);
        assert_eq!(settings.readiness.min_user_chars, 150);
        assert_eq!(settings.readiness.min_keyword_hits, 4);
        assert!(!settings.readiness.keywords.is_empty());
    }

    #[test]
    fn broken_json_is_a_parse_error() {
        assert!(matches!(
            Settings::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
