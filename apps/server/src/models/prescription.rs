//! Prescriptions issued at the school clinic

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{common::Gender, kind::non_empty, RecordKind};
use crate::auth::Role;
use crate::validation::{lenient_date, not_blank, past_date};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Prescription {
    #[validate(custom(function = "not_blank"))]
    pub patient_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 150, message = "must be between 0 and 150"))]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "is required"), custom(function = "past_date"))]
    pub date: Option<NaiveDate>,
    #[validate(
        length(min = 1, message = "must contain at least one medication"),
        nested
    )]
    pub medications: Vec<Medication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescribed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Medication {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub dosage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: Option<i64>,
}

impl Medication {
    /// One printed line, e.g. `Amoxicillin 500mg - 3x a day, 7 days (#21)`.
    pub fn line(&self) -> String {
        let mut line = format!("{} {}", self.name.trim(), self.dosage.trim());
        let schedule: Vec<&str> = [self.frequency.as_deref(), self.duration.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !schedule.is_empty() {
            line.push_str(" - ");
            line.push_str(&schedule.join(", "));
        }
        if let Some(quantity) = self.quantity {
            line.push_str(&format!(" (#{quantity})"));
        }
        line
    }
}

pub struct Prescriptions;

impl RecordKind for Prescriptions {
    type Payload = Prescription;

    const COLLECTION: &'static str = "prescriptions";
    const ID_PREFIX: &'static str = "RX";
    const ID_FIELD: &'static str = "prescriptionId";
    const LABEL: &'static str = "prescription";
    const MUTATE_ROLES: &'static [Role] = &[Role::Doctor, Role::Admin];
    const NAME_FIELDS: &'static [&'static str] = &["/patientName"];
    const DATE_FIELD: &'static str = "/date";

    fn subject_name(payload: &Prescription) -> Option<String> {
        non_empty(&payload.patient_name)
    }
}
