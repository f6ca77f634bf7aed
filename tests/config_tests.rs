//! Runner configuration tests

use parx_core::config::{
    CacheConfig, RunnerConfig, DEFAULT_MAX_TASK_RETRIES, DEFAULT_RESULTS_BUFFER_SIZE,
};
use parx_core::error::Error;
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = RunnerConfig::default();
    assert_eq!(cfg.results_buffer_size, DEFAULT_RESULTS_BUFFER_SIZE);
    assert_eq!(cfg.max_task_retries, DEFAULT_MAX_TASK_RETRIES);
    assert!(cfg.num_workers >= 1);
    assert_eq!(cfg.cache, CacheConfig::default());
    assert!(cfg.cache.max_entries.is_none());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = RunnerConfig::from_lookup(lookup(&[
        ("PARX_RESULTS_BUFFER_SIZE", "3"),
        ("PARX_NUM_WORKERS", " 6 "),
        ("PARX_MAX_TASK_RETRIES", "0"),
        ("PARX_CACHE_MAX_ENTRIES", "10"),
    ]))
    .unwrap();

    assert_eq!(cfg.results_buffer_size, 3);
    assert_eq!(cfg.num_workers, 6);
    assert_eq!(cfg.max_task_retries, 0);
    assert_eq!(cfg.cache.max_entries, Some(10));
}

#[test]
fn test_from_lookup_without_vars_is_default() {
    let cfg = RunnerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, RunnerConfig::default());
}

#[test]
fn test_unparseable_var_is_config_error() {
    let err = RunnerConfig::from_lookup(lookup(&[("PARX_NUM_WORKERS", "many")])).unwrap_err();
    match err {
        Error::Config(msg) => {
            assert!(msg.contains("PARX_NUM_WORKERS"));
            assert!(msg.contains("many"));
        }
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn test_zero_values_rejected() {
    let err = RunnerConfig::from_lookup(lookup(&[("PARX_RESULTS_BUFFER_SIZE", "0")])).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(!err.suggestions().is_empty());

    assert!(RunnerConfig::default().with_num_workers(0).validate().is_err());
    assert!(RunnerConfig::default()
        .with_cache(CacheConfig::with_capacity(0))
        .validate()
        .is_err());
}

#[test]
fn test_builders() {
    let cfg = RunnerConfig::default()
        .with_results_buffer_size(1)
        .with_num_workers(2)
        .with_max_task_retries(5)
        .with_cache(CacheConfig::with_capacity(4));

    assert_eq!(cfg.results_buffer_size, 1);
    assert_eq!(cfg.num_workers, 2);
    assert_eq!(cfg.max_task_retries, 5);
    assert_eq!(cfg.cache.max_entries, Some(4));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_serde_round_trip() {
    let cfg = RunnerConfig::default().with_cache(CacheConfig::with_capacity(2));
    let json = serde_json::to_string(&cfg).unwrap();
    let back: RunnerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}
