//! Annual accomplishment reports

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{common::GenderTally, kind::non_empty, RecordKind};
use crate::auth::Role;
use crate::validation::{error_for_field, lenient_date, modern_date, not_blank, school_year};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnualReport {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "school_year"))]
    pub school_year: String,
    #[validate(nested)]
    pub reporting_period: ReportingPeriod,
    #[validate(nested)]
    pub health_services: HealthServices,
    #[validate(nested)]
    pub activities: Vec<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepared_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "period_in_order", skip_on_field_errors = false))]
pub struct ReportingPeriod {
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "modern_date"))]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "modern_date"))]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthServices {
    #[validate(nested)]
    pub learners_examined: GenderTally,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub referrals_issued: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub referrals_completed: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub prescriptions_issued: i64,
    #[validate(nested)]
    pub personnel_examined: GenderTally,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "modern_date"))]
    pub date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub beneficiaries: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Input of the auto-generate operation. Tallies come from existing records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "request_in_order", skip_on_field_errors = false))]
pub struct AutoGenerateReportInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(custom(function = "school_year"))]
    pub school_year: String,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "modern_date"))]
    pub start_date: Option<NaiveDate>,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "modern_date"))]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl AutoGenerateReportInput {
    /// Inclusive range; `None` until both ends are present.
    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start_date?, self.end_date?))
    }

    pub fn title_or_default(&self) -> String {
        self.title
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| format!("Annual Accomplishment Report {}", self.school_year))
    }
}

fn check_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(error_for_field(
            "date_order",
            "endDate",
            "endDate must be on or after startDate",
        )),
        _ => Ok(()),
    }
}

fn period_in_order(period: &ReportingPeriod) -> Result<(), ValidationError> {
    check_order(period.start_date, period.end_date)
}

fn request_in_order(input: &AutoGenerateReportInput) -> Result<(), ValidationError> {
    check_order(input.start_date, input.end_date)
}

pub struct AnnualReports;

impl RecordKind for AnnualReports {
    type Payload = AnnualReport;

    const COLLECTION: &'static str = "annual_accomplishment_reports";
    const ID_PREFIX: &'static str = "AAR";
    const ID_FIELD: &'static str = "reportId";
    const LABEL: &'static str = "annual accomplishment report";
    const MUTATE_ROLES: &'static [Role] = &[Role::Doctor, Role::Nurse, Role::Admin];
    const NAME_FIELDS: &'static [&'static str] = &["/title", "/preparedBy"];
    const DATE_FIELD: &'static str = "/reportingPeriod/startDate";

    fn subject_name(payload: &AnnualReport) -> Option<String> {
        non_empty(&payload.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse;
    use serde_json::json;

    #[test]
    fn auto_generate_rejects_reversed_range() {
        let err = parse::<AutoGenerateReportInput>(json!({
            "schoolYear": "2023-2024",
            "startDate": "2024-03-31",
            "endDate": "2023-06-01"
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "endDate");
        assert_eq!(errors[0].message, "endDate must be on or after startDate");
    }

    #[test]
    fn reversed_range_reported_with_bad_school_year() {
        let err = parse::<AutoGenerateReportInput>(json!({
            "schoolYear": "2024",
            "startDate": "2024-03-01",
            "endDate": "2024-01-01"
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["endDate", "schoolYear"]);
        assert!(errors[0].message.contains("startDate"));
    }

    #[test]
    fn auto_generate_accepts_single_day_range() {
        let input: AutoGenerateReportInput = parse(json!({
            "schoolYear": "2023-2024",
            "startDate": "2024-01-15",
            "endDate": "2024-01-15"
        }))
        .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(input.range(), Some((day, day)));
        assert_eq!(
            input.title_or_default(),
            "Annual Accomplishment Report 2023-2024"
        );
    }

    #[test]
    fn reporting_period_required_and_ordered() {
        let err = parse::<AnnualReport>(json!({
            "title": "AAR 2023-2024",
            "schoolYear": "2023-2024",
            "reportingPeriod": { "startDate": "2024-05-01", "endDate": "2024-04-01" }
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "reportingPeriod.endDate");

        let err = parse::<AnnualReport>(json!({
            "title": "AAR 2023-2024",
            "schoolYear": "2023-2024"
        }))
        .unwrap_err();
        let crate::Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["reportingPeriod.endDate", "reportingPeriod.startDate"]
        );
    }
}
