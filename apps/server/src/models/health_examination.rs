//! Learner health examinations

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::{Validate, ValidationError};

use super::{common::Gender, kind::non_empty, RecordKind};
use crate::auth::Role;
use crate::validation::{lenient_date, not_blank, past_date, school_year};

lazy_static! {
    static ref BLOOD_PRESSURE: Regex =
        Regex::new(r"^\d{2,3}/\d{2,3}$").expect("valid blood pressure regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeLevel {
    Kindergarten,
    #[serde(rename = "Grade 1")]
    Grade1,
    #[serde(rename = "Grade 2")]
    Grade2,
    #[serde(rename = "Grade 3")]
    Grade3,
    #[serde(rename = "Grade 4")]
    Grade4,
    #[serde(rename = "Grade 5")]
    Grade5,
    #[serde(rename = "Grade 6")]
    Grade6,
    #[serde(rename = "Grade 7")]
    Grade7,
    #[serde(rename = "Grade 8")]
    Grade8,
    #[serde(rename = "Grade 9")]
    Grade9,
    #[serde(rename = "Grade 10")]
    Grade10,
    #[serde(rename = "Grade 11")]
    Grade11,
    #[serde(rename = "Grade 12")]
    Grade12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NutritionalStatus {
    SeverelyWasted,
    Wasted,
    Normal,
    Overweight,
    Obese,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthExamination {
    #[validate(custom(function = "not_blank"))]
    pub learner_name: String,
    /// Learner Reference Number
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "learner_reference_number"))]
    pub lrn: Option<String>,
    #[validate(required(message = "is required"))]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 3, max = 30, message = "must be between 3 and 30"))]
    pub age: Option<i64>,
    #[validate(required(message = "is required"))]
    pub grade_level: Option<GradeLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[validate(custom(function = "school_year"))]
    pub school_year: String,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "past_date"))]
    pub examination_date: Option<NaiveDate>,
    #[validate(nested)]
    pub vital_signs: VitalSigns,
    pub screening: Screening,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examined_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct VitalSigns {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(exclusive_min = 0.0, max = 250.0, message = "must be between 0 and 250"))]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(exclusive_min = 0.0, max = 300.0, message = "must be between 0 and 300"))]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 30.0, max = 45.0, message = "must be between 30 and 45"))]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "blood_pressure_format"))]
    pub blood_pressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub pulse_rate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub respiratory_rate: Option<i64>,
}

impl VitalSigns {
    /// Body mass index rounded to one decimal.
    pub fn bmi(&self) -> Option<f64> {
        let height_m = self.height_cm? / 100.0;
        let weight = self.weight_kg?;
        if height_m <= 0.0 {
            return None;
        }
        Some((weight / (height_m * height_m) * 10.0).round() / 10.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Screening {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hearing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_and_scalp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_and_lungs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dental: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deformities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutritional_status: Option<NutritionalStatus>,
}

fn learner_reference_number(value: &str) -> Result<(), ValidationError> {
    if value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("lrn").with_message("must be a 12-digit number".into()))
    }
}

fn blood_pressure_format(value: &str) -> Result<(), ValidationError> {
    if BLOOD_PRESSURE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("blood_pressure")
            .with_message("must look like 110/70".into()))
    }
}

pub struct HealthExaminations;

impl RecordKind for HealthExaminations {
    type Payload = HealthExamination;

    const COLLECTION: &'static str = "health_examinations";
    const ID_PREFIX: &'static str = "PER";
    const ID_FIELD: &'static str = "examId";
    const LABEL: &'static str = "health examination";
    const MUTATE_ROLES: &'static [Role] = &[Role::Doctor, Role::Nurse, Role::Admin];
    const NAME_FIELDS: &'static [&'static str] = &["/learnerName", "/schoolName"];
    const DATE_FIELD: &'static str = "/examinationDate";

    fn subject_name(payload: &HealthExamination) -> Option<String> {
        non_empty(&payload.learner_name)
    }

    fn decorate(payload: &HealthExamination, view: &mut Map<String, JsonValue>) {
        if let Some(bmi) = payload.vital_signs.bmi() {
            view.insert("bmi".to_string(), JsonValue::from(bmi));
        }
    }

    fn derived_fields() -> &'static [&'static str] {
        &["bmi"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse;
    use serde_json::json;

    fn valid() -> JsonValue {
        json!({
            "learnerName": "Jose Rizal",
            "gender": "Male",
            "gradeLevel": "Grade 5",
            "schoolYear": "2024-2025",
            "examinationDate": "2024-08-20",
            "vitalSigns": { "heightCm": 140.0, "weightKg": 35.0, "bloodPressure": "100/70" }
        })
    }

    #[test]
    fn accepts_valid_examination() {
        let exam: HealthExamination = parse(valid()).unwrap();
        assert_eq!(exam.grade_level, Some(GradeLevel::Grade5));
        assert_eq!(exam.vital_signs.bmi(), Some(17.9));
    }

    #[test]
    fn rejects_unknown_grade_level() {
        let mut body = valid();
        body["gradeLevel"] = json!("Grade 13");
        assert!(parse::<HealthExamination>(body).is_err());
    }

    #[test]
    fn rejects_malformed_vitals_and_school_year() {
        let mut body = valid();
        body["schoolYear"] = json!("2024-24");
        body["vitalSigns"]["bloodPressure"] = json!("high");
        let crate::Error::Validation(errors) = parse::<HealthExamination>(body).unwrap_err()
        else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["schoolYear", "vitalSigns.bloodPressure"]);
    }

    #[test]
    fn blood_pressure_needs_systolic_over_diastolic() {
        assert!(blood_pressure_format("110/70").is_ok());
        assert!(blood_pressure_format("110-70").is_err());

        let mut body = valid();
        body["vitalSigns"]["bloodPressure"] = json!("110-70");
        let crate::Error::Validation(errors) = parse::<HealthExamination>(body).unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "vitalSigns.bloodPressure");
        assert_eq!(errors[0].message, "must look like 110/70");
    }

    #[test]
    fn reports_enum_errors_per_field_with_other_errors() {
        let mut body = valid();
        body["gradeLevel"] = json!("Grade 13");
        body["screening"] = json!({ "nutritionalStatus": "chubby" });
        body["vitalSigns"]["pulseRate"] = json!(-5);
        let crate::Error::Validation(errors) = parse::<HealthExamination>(body).unwrap_err()
        else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "gradeLevel",
                "screening.nutritionalStatus",
                "vitalSigns.pulseRate"
            ]
        );
        assert!(errors[0].message.contains("unknown variant"));
    }
}
