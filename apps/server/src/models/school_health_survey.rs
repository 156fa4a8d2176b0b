//! School health and sanitation surveys

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{common::GenderTally, kind::non_empty, RecordKind};
use crate::auth::Role;
use crate::validation::{lenient_date, not_blank, past_date, school_year};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SchoolHealthSurvey {
    #[validate(custom(function = "not_blank"))]
    pub school_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[validate(custom(function = "school_year"))]
    pub school_year: String,
    pub status: SurveyStatus,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "past_date"))]
    pub date_conducted: Option<NaiveDate>,
    #[validate(nested)]
    pub enrollment: GenderTally,
    #[validate(nested)]
    pub personnel: GenderTally,
    #[validate(nested)]
    pub facilities: Facilities,
    #[validate(nested)]
    pub findings: Findings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conducted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Facilities {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub classrooms: i64,
    #[validate(nested)]
    pub toilets: GenderTally,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub handwashing_stations: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub drinking_fountains: i64,
    pub has_clinic: bool,
    pub has_canteen: bool,
    pub has_potable_water: bool,
}

/// Learners found with each condition during the survey.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Findings {
    #[validate(nested)]
    pub underweight: GenderTally,
    #[validate(nested)]
    pub overweight: GenderTally,
    #[validate(nested)]
    pub dental_caries: GenderTally,
    #[validate(nested)]
    pub pediculosis: GenderTally,
    #[validate(nested)]
    pub vision_problems: GenderTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitation_notes: Option<String>,
}

pub struct SchoolHealthSurveys;

impl RecordKind for SchoolHealthSurveys {
    type Payload = SchoolHealthSurvey;

    const COLLECTION: &'static str = "school_health_surveys";
    const ID_PREFIX: &'static str = "SHS";
    const ID_FIELD: &'static str = "surveyId";
    const LABEL: &'static str = "school health survey";
    const MUTATE_ROLES: &'static [Role] = &[Role::Doctor, Role::Nurse, Role::Staff, Role::Admin];
    const NAME_FIELDS: &'static [&'static str] = &["/schoolName", "/district"];
    const DATE_FIELD: &'static str = "/dateConducted";

    fn subject_name(payload: &SchoolHealthSurvey) -> Option<String> {
        non_empty(&payload.school_name)
    }
}
