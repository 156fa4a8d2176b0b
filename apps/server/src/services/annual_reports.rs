//! Auto-generation of annual accomplishment reports from existing records

use serde_json::Value as JsonValue;

use super::{records::GENERATED, RecordService};
use crate::{
    auth::Principal,
    models::{
        annual_report::ReportingPeriod, AnnualReport, AnnualReports, AutoGenerateReportInput,
        GenderTally, HealthExaminations, HealthServices, PersonnelHealthCards, Prescriptions,
        RecordKind, ReferralSlips, ReturnSlipStatus,
    },
    validation::parse,
    Error, Result,
};

/// Record services the report tallies are drawn from.
#[derive(Clone)]
pub struct ReportSources {
    pub examinations: RecordService<HealthExaminations>,
    pub referrals: RecordService<ReferralSlips>,
    pub prescriptions: RecordService<Prescriptions>,
    pub personnel_cards: RecordService<PersonnelHealthCards>,
}

impl ReportSources {
    /// Tally the caller's active records dated inside the inclusive range.
    pub async fn tally(
        &self,
        owner: &str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<HealthServices> {
        let owner = Some(owner);
        let (exams, referrals, prescriptions, cards) = tokio::try_join!(
            self.examinations.records_dated_between(owner, start, end),
            self.referrals.records_dated_between(owner, start, end),
            self.prescriptions.records_dated_between(owner, start, end),
            self.personnel_cards.records_dated_between(owner, start, end),
        )?;

        let mut learners_examined = GenderTally::default();
        for exam in exams.iter().filter_map(|r| self.examinations.payload_of(r)) {
            learners_examined.add(exam.gender);
        }

        let mut personnel_examined = GenderTally::default();
        for card in cards.iter().filter_map(|r| self.personnel_cards.payload_of(r)) {
            personnel_examined.add(card.gender);
        }

        let referrals_completed = referrals
            .iter()
            .filter_map(|r| self.referrals.payload_of(r))
            .filter(|slip| slip.return_slip.status() == ReturnSlipStatus::Completed)
            .count() as i64;

        Ok(HealthServices {
            learners_examined,
            referrals_issued: referrals.len() as i64,
            referrals_completed,
            prescriptions_issued: prescriptions.len() as i64,
            personnel_examined,
        })
    }
}

impl RecordService<AnnualReports> {
    pub async fn auto_generate(
        &self,
        principal: &Principal,
        body: JsonValue,
        sources: &ReportSources,
    ) -> Result<JsonValue> {
        principal.require_role(
            AnnualReports::MUTATE_ROLES,
            &format!("generate {}s", AnnualReports::LABEL),
        )?;
        let input: AutoGenerateReportInput = parse(body)?;
        let (start, end) = input
            .range()
            .ok_or_else(|| Error::invalid("startDate", "is required"))?;

        let health_services = sources.tally(&principal.user_id, start, end).await?;
        tracing::debug!(
            actor = %principal.user_id,
            %start,
            %end,
            learners = health_services.learners_examined.total(),
            referrals = health_services.referrals_issued,
            "Tallied report sources"
        );

        let report = AnnualReport {
            title: input.title_or_default(),
            school_year: input.school_year.clone(),
            reporting_period: ReportingPeriod {
                start_date: Some(start),
                end_date: Some(end),
            },
            health_services,
            activities: Vec::new(),
            remarks: input.remarks.clone(),
            prepared_by: Some(principal.display_name().to_string()),
        };

        let record = self.insert_payload(principal, &report, GENERATED).await?;
        Ok(self.view(&record))
    }
}
