//! Referral-slip specific operations on top of the shared record service

use serde_json::{json, Value as JsonValue};

use super::RecordService;
use crate::{
    auth::Principal,
    db::RecordQuery,
    models::{RecordKind, ReferralSlips, ReturnSlipStatus},
    Error, Result,
};

impl RecordService<ReferralSlips> {
    /// Merge only the return-slip section.
    ///
    /// Accepts either the bare return-slip object or `{ "returnSlip": {...} }`.
    pub async fn update_return_slip(
        &self,
        principal: &Principal,
        code: &str,
        body: JsonValue,
    ) -> Result<JsonValue> {
        let JsonValue::Object(mut body) = body else {
            return Err(Error::invalid("body", "must be a JSON object"));
        };
        let section = match body.remove("returnSlip") {
            Some(section @ JsonValue::Object(_)) => section,
            Some(_) => return Err(Error::invalid("returnSlip", "must be an object")),
            None => JsonValue::Object(body),
        };
        self.update(principal, code, json!({ "returnSlip": section }))
            .await
    }

    pub async fn list_by_status(
        &self,
        status: ReturnSlipStatus,
        owner: Option<&str>,
    ) -> Result<Vec<JsonValue>> {
        let records = self
            .list_records(&RecordQuery::active(ReferralSlips::COLLECTION).owned_by(owner))
            .await?;
        let matching: Vec<_> = records
            .into_iter()
            .filter(|record| {
                self.payload_of(record)
                    .is_some_and(|slip| slip.return_slip.status() == status)
            })
            .collect();
        Ok(self.views(&matching))
    }

    pub async fn list_pending_return(&self, owner: Option<&str>) -> Result<Vec<JsonValue>> {
        self.list_by_status(ReturnSlipStatus::Pending, owner).await
    }

    pub async fn list_completed(&self, owner: Option<&str>) -> Result<Vec<JsonValue>> {
        self.list_by_status(ReturnSlipStatus::Completed, owner).await
    }

    /// Case-insensitive substring match on the referring clinician.
    pub async fn list_by_referrer(
        &self,
        referrer: &str,
        owner: Option<&str>,
    ) -> Result<Vec<JsonValue>> {
        let referrer = referrer.trim();
        if referrer.is_empty() {
            return Err(Error::invalid("name", "is required"));
        }
        let records = self
            .list_records(
                &RecordQuery::active(ReferralSlips::COLLECTION)
                    .owned_by(owner)
                    .matching(&["/referralSlip/referredBy"], referrer),
            )
            .await?;
        Ok(self.views(&records))
    }
}
