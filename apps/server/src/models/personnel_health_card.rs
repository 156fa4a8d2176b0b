//! Personnel health cards for teaching and non-teaching staff

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{common::Gender, kind::non_empty, RecordKind};
use crate::auth::Role;
use crate::validation::{error_for_field, lenient_date, modern_date, not_blank, past_date};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonnelHealthCard {
    #[validate(custom(function = "not_blank"))]
    pub employee_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    #[validate(required(message = "is required"))]
    pub gender: Option<Gender>,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "past_date"))]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "past_date"))]
    pub date_examined: Option<NaiveDate>,
    #[validate(nested)]
    pub social_history: SocialHistory,
    pub medical_history: Vec<String>,
    #[validate(nested)]
    pub immunizations: Vec<Immunization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "habits_consistent", skip_on_field_errors = false))]
pub struct SocialHistory {
    pub smoker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub sticks_per_day: Option<i64>,
    pub alcohol_drinker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alcohol_frequency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Immunization {
    #[validate(custom(function = "not_blank"))]
    pub vaccine: String,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "modern_date"))]
    pub date_given: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
}

fn habits_consistent(history: &SocialHistory) -> Result<(), ValidationError> {
    let frequency_given = history
        .alcohol_frequency
        .as_deref()
        .is_some_and(|f| !f.trim().is_empty());
    if history.alcohol_drinker && !frequency_given {
        return Err(error_for_field(
            "required",
            "alcoholFrequency",
            "is required when alcoholDrinker is true",
        ));
    }
    if !history.alcohol_drinker && frequency_given {
        return Err(error_for_field(
            "forbidden",
            "alcoholFrequency",
            "must be empty when alcoholDrinker is false",
        ));
    }
    if !history.smoker && history.sticks_per_day.is_some_and(|n| n > 0) {
        return Err(error_for_field(
            "forbidden",
            "sticksPerDay",
            "must be empty when smoker is false",
        ));
    }
    Ok(())
}

pub struct PersonnelHealthCards;

impl RecordKind for PersonnelHealthCards {
    type Payload = PersonnelHealthCard;

    const COLLECTION: &'static str = "personnel_health_cards";
    const ID_PREFIX: &'static str = "PHC";
    const ID_FIELD: &'static str = "cardId";
    const LABEL: &'static str = "personnel health card";
    const MUTATE_ROLES: &'static [Role] = &[Role::Doctor, Role::Nurse, Role::Admin];
    const NAME_FIELDS: &'static [&'static str] = &["/employeeName", "/school"];
    const DATE_FIELD: &'static str = "/dateExamined";

    fn subject_name(payload: &PersonnelHealthCard) -> Option<String> {
        non_empty(&payload.employee_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse;
    use serde_json::{json, Value as JsonValue};

    fn card(social: JsonValue) -> JsonValue {
        json!({
            "employeeName": "Teresa Magbanua",
            "gender": "Female",
            "dateOfBirth": "1985-04-12",
            "socialHistory": social
        })
    }

    fn error_fields(body: JsonValue) -> Vec<String> {
        match parse::<PersonnelHealthCard>(body) {
            Err(crate::Error::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn alcohol_frequency_required_only_for_drinkers() {
        assert_eq!(
            error_fields(card(json!({ "alcoholDrinker": true }))),
            vec!["socialHistory.alcoholFrequency"]
        );
        assert!(parse::<PersonnelHealthCard>(card(json!({
            "alcoholDrinker": true,
            "alcoholFrequency": "occasionally"
        })))
        .is_ok());
        assert!(parse::<PersonnelHealthCard>(card(json!({ "alcoholDrinker": false }))).is_ok());
    }

    #[test]
    fn frequency_rejected_for_non_drinkers() {
        assert_eq!(
            error_fields(card(json!({
                "alcoholDrinker": false,
                "alcoholFrequency": "daily"
            }))),
            vec!["socialHistory.alcoholFrequency"]
        );
    }

    #[test]
    fn frequency_rule_reported_alongside_field_errors() {
        assert_eq!(
            error_fields(card(json!({
                "smoker": true,
                "sticksPerDay": -2,
                "alcoholDrinker": true
            }))),
            vec!["socialHistory.alcoholFrequency", "socialHistory.sticksPerDay"]
        );
    }

    #[test]
    fn birth_date_must_not_predate_1900() {
        let mut body = card(json!({}));
        body["dateOfBirth"] = json!("1899-12-31");
        assert_eq!(error_fields(body), vec!["dateOfBirth"]);
    }
}
