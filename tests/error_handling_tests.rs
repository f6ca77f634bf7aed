//! Error type tests: context chains, classification, suggestions

use parx_core::error::Error;
use parx_exec::TaskError;
use std::error::Error as StdError;

#[test]
fn test_error_context_chain() {
    let err = Error::NotFound("4f2a".into()).with_context("resolving scan input");
    let msg = err.to_string();
    assert!(msg.contains("resolving scan input"));
    assert!(msg.contains("4f2a"));
    assert!(err.is_not_found());
    assert!(err.source().is_some());
}

#[test]
fn test_nested_context_keeps_not_found() {
    let err = Error::NotFound("abc".into())
        .with_context("inner")
        .with_context("outer");
    assert!(err.is_not_found());
    assert!(!Error::Cancelled.with_context("outer").is_not_found());
}

#[test]
fn test_execution_error_carries_source() {
    let err = Error::execution("partition 3 failed", TaskError::Exec("boom".into()));
    assert_eq!(err.to_string(), "execution failed: partition 3 failed");
    let source = err.source().expect("source");
    assert_eq!(source.to_string(), "execution error: boom");
    assert!(!err.suggestions().is_empty());
}

#[test]
fn test_error_display_messages() {
    assert_eq!(
        Error::NotFound("x1".into()).to_string(),
        "partition set 'x1' not found in cache"
    );
    assert!(Error::CacheIdCollision(16).to_string().contains("16 attempts"));
    assert!(Error::Config("bad".into()).to_string().contains("bad"));
}

#[test]
fn test_not_found_suggestions() {
    let suggestions = Error::NotFound("x".into()).suggestions();
    assert!(suggestions.iter().any(|s| s.contains("removed") || s.contains("evicted")));
}

#[test]
fn test_config_suggestions() {
    let err = Error::Config("worker count must be at least 1".into());
    assert!(err.suggestions().iter().any(|s| s.contains("PARX_NUM_WORKERS")));
    assert!(Error::Config("something else".into()).suggestions().is_empty());
}

#[test]
fn test_task_error_context() {
    let err = TaskError::Io("file vanished".into()).with_context("partition 2");
    assert_eq!(err.to_string(), "io error: partition 2: file vanished");

    let err = TaskError::Cancelled.with_context("partition 2");
    assert!(matches!(err, TaskError::Cancelled));
}

#[test]
fn test_recoverable_error_detection() {
    assert!(TaskError::Recoverable("transient error".into()).is_recoverable());
    assert!(!TaskError::Exec("permanent error".into()).is_recoverable());
    assert!(!TaskError::Cancelled.is_recoverable());
}

#[test]
fn test_task_error_suggestions() {
    let suggestions = TaskError::Recoverable("timeout".into()).suggestions();
    assert!(suggestions.iter().any(|s| s.contains("transient")));
    assert!(suggestions.iter().any(|s| s.contains("PARX_MAX_TASK_RETRIES")));

    let suggestions = TaskError::Schema("unknown column 'x'".into()).suggestions();
    assert!(suggestions.iter().any(|s| s.contains("column")));

    assert!(TaskError::Exec("x".into()).suggestions().is_empty());
}
