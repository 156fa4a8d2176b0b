//! Request payload validation
//!
//! Payloads are deserialized with serde (defaults applied, dates coerced) and
//! then checked with `validator`. The outcome is all-or-nothing: either the
//! normalized value or every field-level error found, type errors included.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as JsonValue};
use serde_path_to_error::Segment;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

lazy_static! {
    static ref SCHOOL_YEAR: Regex =
        Regex::new(r"^(\d{4})-(\d{4})$").expect("valid school year regex");
}

const MIN_YEAR: i32 = 1900;

/// Type errors collected from one body before giving up.
const MAX_TYPE_ERRORS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Deserialize and validate an untrusted JSON body.
pub fn parse<T>(value: JsonValue) -> crate::Result<T>
where
    T: DeserializeOwned + Validate,
{
    if !value.is_object() {
        return Err(crate::Error::invalid("body", "must be a JSON object"));
    }

    let (parsed, mut errors) = deserialize_collecting::<T>(value)?;

    if let Err(found) = parsed.validate() {
        for err in field_errors(&found) {
            // A rejected value was dropped; its "is required" follow-up is noise.
            if !errors.iter().any(|e| covers(&e.field, &err.field)) {
                errors.push(err);
            }
        }
    }

    if errors.is_empty() {
        Ok(parsed)
    } else {
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        Err(crate::Error::Validation(errors))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// Deserialize `T`, recording each value serde rejects at its field path and
/// dropping it so the remaining fields are still checked.
fn deserialize_collecting<T>(mut value: JsonValue) -> crate::Result<(T, Vec<FieldError>)>
where
    T: DeserializeOwned,
{
    let mut errors: Vec<FieldError> = Vec::new();
    let mut dropped: Vec<Vec<Step>> = Vec::new();

    loop {
        let err = match serde_path_to_error::deserialize::<_, T>(&value) {
            Ok(parsed) => return Ok((parsed, errors)),
            Err(err) => err,
        };

        let mut steps = steps_of(err.path());
        let field = render(&steps);
        if !errors.iter().any(|e| e.field == field) {
            errors.push(FieldError::new(field, err.into_inner().to_string()));
        }

        // Same spot rejected again: drop the enclosing value instead.
        while dropped.contains(&steps) {
            steps.pop();
        }
        if steps.is_empty() || errors.len() >= MAX_TYPE_ERRORS || !drop_at(&mut value, &steps) {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            return Err(crate::Error::Validation(errors));
        }
        dropped.push(steps);
    }
}

fn steps_of(path: &serde_path_to_error::Path) -> Vec<Step> {
    let mut steps = Vec::new();
    for segment in path.iter() {
        match segment {
            Segment::Map { key } => steps.push(Step::Key(key.clone())),
            Segment::Seq { index } => steps.push(Step::Index(*index)),
            _ => break,
        }
    }
    steps
}

fn render(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            Step::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Step::Index(index) => {
                if out.is_empty() {
                    out.push_str("body");
                }
                out.push_str(&format!("[{index}]"));
            }
        }
    }
    if out.is_empty() {
        out.push_str("body");
    }
    out
}

/// Map keys are removed (payload structs default them). List items become an
/// empty object so later indexes keep their position.
fn drop_at(value: &mut JsonValue, steps: &[Step]) -> bool {
    let Some((last, parents)) = steps.split_last() else {
        return false;
    };
    let mut current = value;
    for step in parents {
        let next = match step {
            Step::Key(key) => current.get_mut(key.as_str()),
            Step::Index(index) => current.get_mut(*index),
        };
        match next {
            Some(next) => current = next,
            None => return false,
        }
    }
    match (last, current) {
        (Step::Key(key), JsonValue::Object(map)) => map.remove(key).is_some(),
        (Step::Index(index), JsonValue::Array(items)) => match items.get_mut(*index) {
            Some(item) => {
                *item = json!({});
                true
            }
            None => false,
        },
        _ => false,
    }
}

fn covers(rejected: &str, field: &str) -> bool {
    field == rejected
        || field
            .strip_prefix(rejected)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

/// Flatten nested `validator` errors into camelCase dotted field paths.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(None, errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = field.to_string();
        let path = if field == "__all__" {
            prefix.map(str::to_string)
        } else {
            Some(join(prefix, &to_camel(&field)))
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    // Struct-level checks name their target field through a param.
                    let target = err
                        .params
                        .get("field")
                        .and_then(|v| v.as_str())
                        .map(|f| join(path.as_deref(), f))
                        .or_else(|| path.clone())
                        .unwrap_or_else(|| "body".to_string());
                    out.push(FieldError::new(target, message_for(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                collect(path.as_deref(), inner, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    let indexed = format!("{}[{}]", path.as_deref().unwrap_or("body"), index);
                    collect(Some(&indexed), inner, out);
                }
            }
        }
    }
}

fn join(prefix: Option<&str>, field: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}.{field}"),
        _ => field.to_string(),
    }
}

fn to_camel(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn message_for(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    match err.code.as_ref() {
        "required" => "is required".to_string(),
        "length" => "has an invalid length".to_string(),
        "range" => match err.params.get("min") {
            Some(min) => format!("must be greater than or equal to {min}"),
            None => "is out of range".to_string(),
        },
        other => format!("is invalid ({other})"),
    }
}

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Struct-level error attributed to `field`.
pub fn error_for_field(
    code: &'static str,
    field: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> ValidationError {
    let mut err = error(code, message);
    err.add_param(Cow::Borrowed("field"), &field);
    err
}

/// `YYYY-YYYY` spanning two consecutive years.
pub fn school_year(value: &str) -> Result<(), ValidationError> {
    let Some(caps) = SCHOOL_YEAR.captures(value) else {
        return Err(error(
            "school_year",
            "must be a school year in the format YYYY-YYYY",
        ));
    };
    let start: i32 = caps[1].parse().unwrap_or_default();
    let end: i32 = caps[2].parse().unwrap_or_default();
    if end != start + 1 {
        return Err(error(
            "school_year",
            "must span two consecutive years (e.g. 2024-2025)",
        ));
    }
    Ok(())
}

/// Not before 1900 and not after today (UTC).
pub fn past_date(value: &NaiveDate) -> Result<(), ValidationError> {
    if value.year() < MIN_YEAR {
        return Err(error("date_min", "must not be earlier than 1900-01-01"));
    }
    if *value > Utc::now().date_naive() {
        return Err(error("date_max", "must not be in the future"));
    }
    Ok(())
}

/// Not before 1900; future dates allowed (follow-up and planning dates).
pub fn modern_date(value: &NaiveDate) -> Result<(), ValidationError> {
    if value.year() < MIN_YEAR {
        return Err(error("date_min", "must not be earlier than 1900-01-01"));
    }
    Ok(())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("required", "is required"))
    } else {
        Ok(())
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (the date part is kept).
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// Serde adapter for optional dates that tolerates full timestamps and empty strings.
pub mod lenient_date {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => coerce_date(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    #[validate(schema(function = "period_in_order"))]
    struct Period {
        #[validate(custom(function = "school_year"))]
        school_year: String,
        #[serde(default, with = "lenient_date")]
        start_date: Option<NaiveDate>,
        #[serde(default, with = "lenient_date")]
        end_date: Option<NaiveDate>,
        #[validate(range(min = 0, message = "must not be negative"))]
        #[serde(default)]
        total_count: i64,
    }

    fn period_in_order(p: &Period) -> Result<(), ValidationError> {
        match (p.start_date, p.end_date) {
            (Some(start), Some(end)) if end < start => Err(error_for_field(
                "date_order",
                "endDate",
                "must be on or after startDate",
            )),
            _ => Ok(()),
        }
    }

    #[test]
    fn school_year_format() {
        assert!(school_year("2024-2025").is_ok());
        assert!(school_year("2024").is_err());
        assert!(school_year("2024-24").is_err());
        assert!(school_year("20242025").is_err());
        assert!(school_year("2024-2026").is_err());
    }

    #[test]
    fn date_bounds() {
        assert!(past_date(&NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()).is_err());
        assert!(past_date(&NaiveDate::from_ymd_opt(1990, 5, 1).unwrap()).is_ok());
        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        assert!(past_date(&tomorrow).is_err());
        assert!(modern_date(&tomorrow).is_ok());
    }

    #[test]
    fn coerces_timestamps_to_dates() {
        assert_eq!(
            coerce_date("2024-01-15T10:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            coerce_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(coerce_date("15/01/2024"), None);
    }

    #[test]
    fn collects_all_field_errors_in_camel_case() {
        let err = parse::<Period>(serde_json::json!({
            "schoolYear": "2024",
            "totalCount": -1
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["schoolYear", "totalCount"]);
        assert_eq!(errors[1].message, "must not be negative");
    }

    #[test]
    fn struct_level_error_targets_named_field() {
        let err = parse::<Period>(serde_json::json!({
            "schoolYear": "2024-2025",
            "startDate": "2024-06-01",
            "endDate": "2024-05-01"
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "endDate");
        assert!(errors[0].message.contains("startDate"));
    }

    #[test]
    fn type_errors_reported_per_field_with_rule_errors() {
        let err = parse::<Period>(serde_json::json!({
            "schoolYear": "2024",
            "startDate": "next week",
            "totalCount": "many"
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["schoolYear", "startDate", "totalCount"]);
        assert!(errors[1].message.contains("invalid date"));
    }

    #[test]
    fn list_items_keep_their_index() {
        #[derive(Debug, Default, Deserialize, Validate)]
        #[serde(rename_all = "camelCase", default)]
        struct Batch {
            #[validate(nested)]
            periods: Vec<Period>,
            tags: Vec<String>,
        }

        let err = parse::<Batch>(serde_json::json!({
            "periods": [
                { "schoolYear": "2024-2025" },
                { "schoolYear": "2024-2025", "totalCount": "x" },
                { "schoolYear": "2024" }
            ],
            "tags": ["a", 7]
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["periods[1].totalCount", "periods[2].schoolYear", "tags[1]"]
        );
    }

    #[test]
    fn rejects_non_object_body() {
        assert!(parse::<Period>(serde_json::json!([1, 2])).is_err());
    }
}
