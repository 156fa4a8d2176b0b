use anyhow::Context as _;
use axum::http::StatusCode;
use serde_json::Value;

pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(
        actual, expected,
        "{context}: expected status {expected}, got {actual}"
    );
}

/// Assert a list envelope and return its items.
pub fn list_items(envelope: &Value) -> anyhow::Result<&Vec<Value>> {
    let items = envelope["data"].as_array().context("data is an array")?;
    assert_eq!(
        envelope["total"].as_u64(),
        Some(items.len() as u64),
        "total must match the number of items"
    );
    assert!(envelope["timestamp"].is_string(), "list envelope has timestamp");
    Ok(items)
}

/// Ids of the records in a list envelope.
pub fn list_ids(envelope: &Value) -> anyhow::Result<Vec<String>> {
    Ok(list_items(envelope)?
        .iter()
        .filter_map(|r| r["id"].as_str().map(str::to_string))
        .collect())
}

/// Assert a validation error envelope names `field`.
pub fn assert_field_error(body: &Value, field: &str) -> anyhow::Result<()> {
    let errors = body["errors"].as_array().context("errors is an array")?;
    assert!(
        errors.iter().any(|e| e["field"] == field),
        "expected a validation error for '{field}', got {errors:?}"
    );
    Ok(())
}

/// `<PREFIX>-YYYYMMDD-XXXXXX`
pub fn assert_formatted_id(id: &str, prefix: &str) {
    let rest = id
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('-'))
        .unwrap_or_else(|| panic!("id {id} should start with {prefix}-"));
    let (date, suffix) = rest
        .split_once('-')
        .unwrap_or_else(|| panic!("id {id} should have a date and a suffix"));
    assert!(
        date.len() == 8 && date.chars().all(|c| c.is_ascii_digit()),
        "id {id} should carry an 8-digit date"
    );
    assert!(
        suffix.len() == 6 && suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()),
        "id {id} should end in 6 uppercase alphanumerics"
    );
}
