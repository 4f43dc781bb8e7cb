//! Tests for RepositoryError construction, display and classification.

use constellation_store::db::{ErrorContext, RepositoryError};

#[test]
fn test_error_context_builder() {
    let ctx = ErrorContext::new("import_scenario")
        .with_entity("satellite")
        .with_entity_id("S-1")
        .with_field("satellites[3].orbit.ecc")
        .with_record_index(3)
        .with_details("ecc=1.2");

    assert_eq!(ctx.operation.as_deref(), Some("import_scenario"));
    assert_eq!(ctx.entity.as_deref(), Some("satellite"));
    assert_eq!(ctx.entity_id.as_deref(), Some("S-1"));
    assert_eq!(ctx.field.as_deref(), Some("satellites[3].orbit.ecc"));
    assert_eq!(ctx.record_index, Some(3));
    assert_eq!(ctx.details.as_deref(), Some("ecc=1.2"));
    assert!(!ctx.retryable);
}

#[test]
fn test_error_context_display() {
    let ctx = ErrorContext::new("create_satellite")
        .with_field("sat_id")
        .with_record_index(0)
        .retryable();
    let text = ctx.to_string();
    assert!(text.starts_with('['));
    assert!(text.contains("operation=create_satellite"));
    assert!(text.contains("field=sat_id"));
    assert!(text.contains("index=0"));
    assert!(text.contains("retryable=true"));
}

#[test]
fn test_error_display_names_category() {
    let cases = [
        (RepositoryError::document_parse("bad"), "Document parse error"),
        (RepositoryError::validation("bad"), "Validation error"),
        (RepositoryError::constraint("bad"), "Constraint violation"),
        (RepositoryError::connectivity("bad"), "Connectivity error"),
        (RepositoryError::not_found("bad"), "Not found"),
        (RepositoryError::configuration("bad"), "Configuration error"),
        (RepositoryError::internal("bad"), "Internal error"),
    ];
    for (err, prefix) in cases {
        let text = err.to_string();
        assert!(text.starts_with(prefix), "{} should start with {}", text, prefix);
        assert!(text.contains("bad"));
    }
}

#[test]
fn test_only_connectivity_is_retryable_by_default() {
    assert!(RepositoryError::connectivity("down").is_retryable());
    assert!(RepositoryError::connectivity_with_context("down", ErrorContext::new("op")).is_retryable());

    assert!(!RepositoryError::validation("x").is_retryable());
    assert!(!RepositoryError::constraint("x").is_retryable());
    assert!(!RepositoryError::not_found("x").is_retryable());
    assert!(!RepositoryError::document_parse("x").is_retryable());
}

#[test]
fn test_domain_constructors() {
    let err = RepositoryError::scenario_not_found("get_scenario", 12);
    assert!(err.is_not_found());
    assert_eq!(err.context().entity.as_deref(), Some("scenario"));
    assert_eq!(err.context().entity_id.as_deref(), Some("12"));

    let err = RepositoryError::missing_owner("create_satellite", 5);
    assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));
    assert_eq!(err.context().field.as_deref(), Some("scenario_id"));

    let err = RepositoryError::duplicate_sat_id("create_satellite", 5, "STAR-1");
    assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));
    assert!(err.to_string().contains("STAR-1"));
}

#[test]
fn test_with_operation_keeps_innermost() {
    let tagged = RepositoryError::validation("x").with_operation("import_scenario");
    assert_eq!(tagged.context().operation.as_deref(), Some("import_scenario"));

    let inner = RepositoryError::scenario_not_found("get_scenario", 1).with_operation("outer");
    assert_eq!(inner.context().operation.as_deref(), Some("get_scenario"));
}

#[test]
fn test_error_is_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    let err = RepositoryError::internal("boom");
    assert_error(&err);
    let any: anyhow::Error = err.into();
    assert!(any.to_string().contains("boom"));
}
