//! API key parsing, validation and redaction.

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, KbError};

/// Prefix of keys issued for the sandbox environment
pub const TEST_KEY_PREFIX: &str = "vk_test_";
/// Prefix of keys issued for the production environment
pub const LIVE_KEY_PREFIX: &str = "vk_live_";
/// Minimum length of the secret part following the prefix
pub const MIN_SECRET_LEN: usize = 32;
/// Minimum total key length
pub const MIN_KEY_LEN: usize = 40;

const VISIBLE_HEAD: usize = 8;
const VISIBLE_TAIL: usize = 4;
const MASK: char = '*';

/// Environment a key was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Sandbox keys (`vk_test_...`)
    Test,
    /// Production keys (`vk_live_...`)
    Live,
}

impl Environment {
    /// Returns true for sandbox keys
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }

    /// Key prefix for this environment
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Test => TEST_KEY_PREFIX,
            Self::Live => LIVE_KEY_PREFIX,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Live => "live",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = KbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "live" => Ok(Self::Live),
            other => Err(KbError::config(format!(
                "Unknown environment '{other}': expected 'test' or 'live'"
            ))),
        }
    }
}

/// Outcome of [`validate_api_key`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValidation {
    /// True when no rule was violated
    pub valid: bool,
    /// Environment derived from the prefix; unset when the prefix is unknown
    pub environment: Option<Environment>,
    /// Every violated rule, in check order
    pub errors: Vec<String>,
}

fn prefix_message() -> String {
    format!("API key must start with '{TEST_KEY_PREFIX}' or '{LIVE_KEY_PREFIX}'")
}

fn environment_from_prefix(raw: &str) -> Option<Environment> {
    if raw.starts_with(TEST_KEY_PREFIX) {
        Some(Environment::Test)
    } else if raw.starts_with(LIVE_KEY_PREFIX) {
        Some(Environment::Live)
    } else {
        None
    }
}

fn has_valid_shape(raw: &str) -> bool {
    let Some(env) = environment_from_prefix(raw) else {
        return false;
    };
    let secret = &raw[env.prefix().len()..];
    secret.len() >= MIN_SECRET_LEN && secret.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Checks a raw key against every rule and reports all violations
///
/// Never fails; use [`ApiKey::parse`] for the fail-fast form.
#[must_use]
pub fn validate_api_key(raw: &str) -> KeyValidation {
    let mut errors = Vec::new();

    if raw.is_empty() {
        errors.push("API key is required".to_string());
    }

    let environment = environment_from_prefix(raw);
    if environment.is_none() {
        errors.push(prefix_message());
    }

    if !has_valid_shape(raw) {
        errors.push(format!(
            "API key must match vk_<test|live>_<secret> with at least {MIN_SECRET_LEN} alphanumeric characters"
        ));
    }

    if raw.chars().count() < MIN_KEY_LEN {
        errors.push(format!(
            "API key must be at least {MIN_KEY_LEN} characters long"
        ));
    }

    KeyValidation {
        valid: errors.is_empty(),
        environment,
        errors,
    }
}

/// Masks the middle of a key, keeping the first 8 and last 4 characters
///
/// The output always has as many characters as the input. Inputs shorter
/// than 12 characters are returned unchanged.
#[must_use]
pub fn redact(raw: &str) -> String {
    let len = raw.chars().count();
    if len < VISIBLE_HEAD + VISIBLE_TAIL {
        return raw.to_string();
    }
    raw.chars()
        .enumerate()
        .map(|(i, c)| {
            if i < VISIBLE_HEAD || i >= len - VISIBLE_TAIL {
                c
            } else {
                MASK
            }
        })
        .collect()
}

/// A validated API key
///
/// The raw value lives in a [`SecretString`]; `Debug` only shows the
/// redacted form.
#[derive(Clone)]
pub struct ApiKey {
    secret: SecretString,
    environment: Environment,
}

impl ApiKey {
    /// Parses and validates a raw key, failing on the most relevant violation
    ///
    /// Applies exactly the rules of [`validate_api_key`]; surrounding
    /// whitespace is not stripped.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidApiKey`] error if any rule is violated.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, KbError> {
        let raw = raw.as_ref();
        let report = validate_api_key(raw);
        match (report.environment, report.errors.into_iter().next()) {
            (Some(environment), None) => Ok(Self {
                secret: SecretString::from(raw.to_string()),
                environment,
            }),
            (_, first) => Err(KbError::new(ErrorKind::InvalidApiKey)
                .with_message(first.unwrap_or_else(prefix_message))),
        }
    }

    /// Environment the key was issued for
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Redacted form, safe for logs
    #[must_use]
    pub fn redacted(&self) -> String {
        redact(self.secret.expose_secret())
    }

    /// `Authorization: Bearer <key>` header pair
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded as a header value.
    pub fn auth_header(&self) -> Result<(HeaderName, HeaderValue), KbError> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", self.secret.expose_secret()))
                .map_err(|_| KbError::config("API key is not a valid header value"))?;
        value.set_sensitive(true);
        Ok((AUTHORIZATION, value))
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &self.redacted())
            .field("environment", &self.environment)
            .finish()
    }
}

impl std::str::FromStr for ApiKey {
    type Err = KbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_KEY: &str = "vk_test_abcdefghijklmnopqrstuvwxyz123456";

    #[test]
    fn valid_test_key() {
        let report = validate_api_key(TEST_KEY);
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.environment, Some(Environment::Test));
        assert!(report.errors.is_empty());

        let key = ApiKey::parse(TEST_KEY).unwrap();
        assert_eq!(key.environment(), Environment::Test);
    }

    #[test]
    fn valid_live_key() {
        let raw = format!("{LIVE_KEY_PREFIX}{}", "A1".repeat(16));
        let key = ApiKey::parse(&raw).unwrap();
        assert_eq!(key.environment(), Environment::Live);
        assert!(!key.environment().is_test());
    }

    #[test]
    fn redaction_of_reference_key() {
        let key = ApiKey::parse(TEST_KEY).unwrap();
        let expected = format!("vk_test_{}3456", "*".repeat(28));
        assert_eq!(key.redacted(), expected);
        assert_eq!(redact(TEST_KEY), expected);
    }

    #[test]
    fn invalid_key_reports_prefix() {
        let report = validate_api_key("invalid_key");
        assert!(!report.valid);
        assert!(report.environment.is_none());
        assert!(report.errors.iter().any(|e| e.contains("vk_test_")
            && e.contains("vk_live_")));
        // prefix, shape and length are all violated
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn empty_key_reports_every_rule() {
        let report = validate_api_key("");
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 4);
        assert_eq!(report.errors[0], "API key is required");
    }

    #[test]
    fn short_secret_keeps_environment() {
        let report = validate_api_key("vk_live_tooshort");
        assert!(!report.valid);
        assert_eq!(report.environment, Some(Environment::Live));
    }

    #[test]
    fn non_alphanumeric_secret_rejected() {
        let raw = format!("{TEST_KEY_PREFIX}{}-", "a".repeat(32));
        let report = validate_api_key(&raw);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn parse_fails_fast_with_single_message() {
        let err = ApiKey::parse("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidApiKey);
        assert_eq!(err.message(), "API key is required");

        let err = ApiKey::parse("invalid_key").unwrap_err();
        assert!(err.message().contains("vk_test_"));
        assert_eq!(err.status(), 401);
    }

    #[test]
    fn parse_agrees_with_validation_on_padded_input() {
        for raw in [
            format!(" {TEST_KEY} "),
            format!("{TEST_KEY}\n"),
            format!("\t{TEST_KEY}"),
            TEST_KEY.to_string(),
        ] {
            let report = validate_api_key(&raw);
            assert_eq!(ApiKey::parse(&raw).is_ok(), report.valid, "input {raw:?}");
        }
        assert!(ApiKey::parse(format!(" {TEST_KEY} ")).is_err());
    }

    #[test]
    fn auth_header_is_bearer_and_sensitive() {
        let key = ApiKey::parse(TEST_KEY).unwrap();
        let (name, value) = key.auth_header().unwrap();
        assert_eq!(name, AUTHORIZATION);
        assert_eq!(value.to_str().unwrap(), format!("Bearer {TEST_KEY}"));
        assert!(value.is_sensitive());
    }

    #[test]
    fn debug_does_not_leak_key() {
        let key = ApiKey::parse(TEST_KEY).unwrap();
        let dbg = format!("{key:?}");
        assert!(!dbg.contains(TEST_KEY));
        assert!(dbg.contains("vk_test_****"));
    }

    #[test]
    fn environment_parses_and_displays() {
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
        assert_eq!(Environment::Live.to_string(), "live");
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn short_input_is_not_masked() {
        assert_eq!(redact("abc"), "abc");
        assert_eq!(redact("12345678901"), "12345678901");
        assert_eq!(redact("123456789012"), "123456789012");
        assert_eq!(redact("1234567890123"), "12345678*0123");
    }

    proptest! {
        #[test]
        fn redaction_preserves_length(s in ".{0,80}") {
            let out = redact(&s);
            prop_assert_eq!(out.chars().count(), s.chars().count());
        }

        #[test]
        fn short_inputs_unchanged(s in ".{0,11}") {
            prop_assert_eq!(redact(&s), s);
        }
    }
}
