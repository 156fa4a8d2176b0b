//! Formatted record identifiers
//!
//! External keys look like `RS-20240115-AB12CD`: a type prefix, the UTC
//! creation date, and six uppercase hex characters.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

const SUFFIX_LEN: usize = 6;
const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEF";

/// Generate a formatted id for `prefix` created at `now`.
pub fn generate(prefix: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

/// Check `code` against the `<PREFIX>-YYYYMMDD-XXXXXX` shape.
///
/// The suffix accepts any uppercase alphanumerics, not only hex.
pub fn is_valid(prefix: &str, code: &str) -> bool {
    let Some(rest) = code.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
        return false;
    };
    let Some((date, suffix)) = rest.split_once('-') else {
        return false;
    };

    date.len() == 8
        && date.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && suffix.len() == SUFFIX_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
}

/// Reject malformed path ids before they reach storage.
pub fn ensure_valid(prefix: &str, field: &str, code: &str) -> crate::Result<()> {
    if is_valid(prefix, code) {
        Ok(())
    } else {
        Err(crate::Error::invalid(
            field,
            format!("must match the format {prefix}-YYYYMMDD-XXXXXX"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_ids_are_valid() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        let id = generate("AAR", now);
        assert!(id.starts_with("AAR-20240115-"), "{id}");
        assert!(is_valid("AAR", &id), "{id}");
    }

    #[test]
    fn accepts_well_formed_report_id() {
        assert!(is_valid("AAR", "AAR-20240115-AB12CD"));
    }

    #[test]
    fn rejects_short_date() {
        assert!(!is_valid("AAR", "AAR-2024115-AB12CD"));
    }

    #[test]
    fn rejects_wrong_prefix_and_suffix() {
        assert!(!is_valid("PHC", "AAR-20240115-AB12CD"));
        assert!(!is_valid("AAR", "AAR-20240115-ab12cd"));
        assert!(!is_valid("AAR", "AAR-20240115-AB12C"));
        assert!(!is_valid("AAR", "AAR-20241315-AB12CD"));
    }

    #[test]
    fn ensure_valid_reports_field() {
        let err = ensure_valid("PER", "examId", "nope").unwrap_err();
        match err {
            crate::Error::Validation(errors) => assert_eq!(errors[0].field, "examId"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
