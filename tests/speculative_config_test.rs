//! Unit tests for SpeculativeConfig and configuration files.

use std::io::Write;

use spec_decode::{load_config, DecoderConfig, Error, SpeculativeConfig};

#[test]
fn test_default_config() {
    let config = SpeculativeConfig::default();
    assert_eq!(config.num_speculative_tokens, 5);
    assert_eq!(config.probability_precision, None);
    assert_eq!(config.seed, None);
    assert_eq!(config.max_new_tokens, 32);
    assert!(config.validate().is_ok());
}

#[test]
fn test_builder_pattern() {
    let config = SpeculativeConfig::default()
        .num_tokens(8)
        .precision(4)
        .seed(42)
        .max_new_tokens(64);

    assert_eq!(config.num_speculative_tokens, 8);
    assert_eq!(config.probability_precision, Some(4));
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.max_new_tokens, 64);
}

#[test]
fn test_validation_errors() {
    let err = SpeculativeConfig::default().num_tokens(0).validate().unwrap_err();
    assert!(err.to_string().contains("num_speculative_tokens"));

    let err = SpeculativeConfig::default().precision(12).validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "speculative": {{ "num_speculative_tokens": 3, "seed": 7 }},
            "provider": {{ "max_context_tokens": 512 }}
        }}"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.speculative.num_speculative_tokens, 3);
    assert_eq!(config.speculative.seed, Some(7));
    assert_eq!(config.speculative.probability_precision, None);
    assert_eq!(config.provider.max_context_tokens, Some(512));
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"speculative": {{"num_speculative_tokens": 0}}}}"#).unwrap();

    assert!(matches!(load_config(file.path()), Err(Error::Config(_))));
}

#[test]
fn test_load_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config(&dir.path().join("missing.json"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_default_config_round_trips_through_json() {
    let json = serde_json::to_string(&DecoderConfig::default()).unwrap();
    let parsed: DecoderConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, DecoderConfig::default());
}
