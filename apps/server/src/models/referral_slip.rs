//! Referral slips: an outgoing referral and the returned findings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

use super::{common::Gender, kind::non_empty, RecordKind};
use crate::auth::Role;
use crate::validation::{lenient_date, modern_date, not_blank};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralSlip {
    #[validate(nested)]
    pub referral_slip: ReferralDetails,
    #[validate(nested)]
    pub return_slip: ReturnDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferralDetails {
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "modern_date"))]
    pub date: Option<NaiveDate>,
    #[validate(custom(function = "not_blank"))]
    pub patient_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 150, message = "must be between 0 and 150"))]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_and_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_referral: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub referred_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_to: Option<String>,
}

/// Filled in by the receiving clinician; sparse until the patient returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ReturnDetails {
    #[serde(with = "lenient_date", skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "modern_date"))]
    pub date: Option<NaiveDate>,
    pub findings: String,
    pub action_or_recommendations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnSlipStatus {
    Pending,
    Completed,
}

impl ReturnDetails {
    pub fn status(&self) -> ReturnSlipStatus {
        if self.findings.trim().is_empty() || self.action_or_recommendations.trim().is_empty() {
            ReturnSlipStatus::Pending
        } else {
            ReturnSlipStatus::Completed
        }
    }
}

pub struct ReferralSlips;

impl RecordKind for ReferralSlips {
    type Payload = ReferralSlip;

    const COLLECTION: &'static str = "referral_slips";
    const ID_PREFIX: &'static str = "RS";
    const ID_FIELD: &'static str = "rsId";
    const LABEL: &'static str = "referral slip";
    const MUTATE_ROLES: &'static [Role] = &[Role::Doctor, Role::Nurse, Role::Admin];
    const NAME_FIELDS: &'static [&'static str] = &["/referralSlip/patientName"];
    const DATE_FIELD: &'static str = "/referralSlip/date";

    fn subject_name(payload: &ReferralSlip) -> Option<String> {
        non_empty(&payload.referral_slip.patient_name)
    }

    fn decorate(payload: &ReferralSlip, view: &mut Map<String, JsonValue>) {
        if let Ok(status) = serde_json::to_value(payload.return_slip.status()) {
            view.insert("returnSlipStatus".to_string(), status);
        }
    }

    fn derived_fields() -> &'static [&'static str] {
        &["returnSlipStatus"]
    }
}
