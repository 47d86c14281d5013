//! Practice service facade.
//!
//! Wires the prescription directory, status store, transition rule engine and
//! settlement composer together behind one object the delivery surfaces (REST
//! handlers, CLI) talk to. Every operation is keyed by prescription number;
//! unknown numbers surface as [`EngineError::UnknownPrescription`] before any
//! state is touched.

use crate::config::CoreConfig;
use crate::directory::PrescriptionDirectory;
use crate::error::EngineResult;
use crate::records::Prescription;
use crate::rules::{TransitionPlan, TransitionRuleEngine};
use crate::settlement::{
    CopaymentInvoice, RefundLetter, SettlementComposer, SettlementView,
};
use crate::status::{CopaymentBillingStatus, InsuranceBillingStatus, PrescriptionStatus};
use crate::store::StatusStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use vo_types::PrescriptionNumber;

/// The effective copayment billing value the table shows for a prescription.
///
/// Exempt patients are `NotApplicable`, a different thing than a billable
/// patient whose copayment simply has no status yet (`Unset`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectiveCopaymentStatus {
    NotApplicable,
    Unset,
    Status(CopaymentBillingStatus),
}

/// One row of the dashboard table: the base record plus the effective
/// (override-aware) status values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrescriptionOverview {
    pub number: PrescriptionNumber,
    pub patient_name: String,
    pub treatment_label: String,
    pub completed_treatments: u32,
    pub prescribed_treatments: u32,
    pub amount_per_treatment: Decimal,
    pub status: PrescriptionStatus,
    pub insurance_billing_status: Option<InsuranceBillingStatus>,
    pub copayment_billing: EffectiveCopaymentStatus,
    /// Whether the "generate refund" control should be offered at all.
    pub refund_available: bool,
}

/// Facade over the prescription engine.
#[derive(Debug)]
pub struct PracticeService {
    directory: PrescriptionDirectory,
    store: Arc<StatusStore>,
    engine: TransitionRuleEngine,
    composer: SettlementComposer,
}

impl PracticeService {
    /// Loads the base records per configuration and wires up an isolated
    /// store, engine and composer.
    pub fn new(cfg: Arc<CoreConfig>) -> EngineResult<Self> {
        let directory = match cfg.dataset_path() {
            Some(path) => PrescriptionDirectory::from_file(path)?,
            None => PrescriptionDirectory::demo()?,
        };

        tracing::info!(prescriptions = directory.len(), "loaded prescription records");

        let store = Arc::new(StatusStore::new());
        let engine = TransitionRuleEngine::new(store.clone());
        let composer = SettlementComposer::new(cfg.practice_name(), directory.all());

        Ok(Self {
            directory,
            store,
            engine,
            composer,
        })
    }

    /// The loaded base records.
    pub fn directory(&self) -> &PrescriptionDirectory {
        &self.directory
    }

    fn record(&self, number: &PrescriptionNumber) -> EngineResult<&Prescription> {
        self.directory.require(number)
    }

    /// Dashboard rows with effective statuses layered over the base records.
    pub fn overview(&self) -> EngineResult<Vec<PrescriptionOverview>> {
        self.directory
            .all()
            .iter()
            .map(|record| self.overview_row(record))
            .collect()
    }

    fn overview_row(&self, record: &Prescription) -> EngineResult<PrescriptionOverview> {
        let status = self
            .store
            .prescription_status(&record.number, record.status)?;
        let insurance_billing_status = self
            .store
            .insurance_billing_status(&record.number, record.insurance_billing_status)?;

        let copayment_billing = if record.copayment.is_exempt() {
            EffectiveCopaymentStatus::NotApplicable
        } else {
            match self
                .store
                .copayment_billing_status(&record.number, record.copayment.base_billing_status())?
            {
                Some(value) => EffectiveCopaymentStatus::Status(value),
                None => EffectiveCopaymentStatus::Unset,
            }
        };

        Ok(PrescriptionOverview {
            number: record.number.clone(),
            patient_name: record.patient_name.clone(),
            treatment_label: record.treatment_label.clone(),
            completed_treatments: record.completed_treatments,
            prescribed_treatments: record.prescribed_treatments,
            amount_per_treatment: record.amount_per_treatment,
            status,
            insurance_billing_status,
            copayment_billing,
            refund_available: self.composer.can_generate_refund(record),
        })
    }

    /// Changes the prescription status, applying the cross-field rules, and
    /// returns the applied plan.
    pub fn change_prescription_status(
        &self,
        number: &PrescriptionNumber,
        new_status: PrescriptionStatus,
    ) -> EngineResult<TransitionPlan> {
        let record = self.record(number)?;
        self.engine.change_prescription_status(new_status, record)
    }

    /// Direct insurer-side billing write.
    pub fn change_insurance_billing_status(
        &self,
        number: &PrescriptionNumber,
        new_status: Option<InsuranceBillingStatus>,
    ) -> EngineResult<()> {
        let record = self.record(number)?;
        self.engine
            .change_insurance_billing_status(&record.number, new_status)
    }

    /// Direct patient-side copayment billing write; refused for exempt
    /// patients.
    pub fn change_copayment_billing_status(
        &self,
        number: &PrescriptionNumber,
        new_status: Option<CopaymentBillingStatus>,
    ) -> EngineResult<()> {
        let record = self.record(number)?;
        self.engine
            .change_copayment_billing_status(record, new_status)
    }

    /// Collaborator hook for the document-preview surface: aborts the
    /// treatment course. The optional follow-up queue update lives outside
    /// this engine; the request is only logged here.
    pub fn mark_as_aborted(
        &self,
        number: &PrescriptionNumber,
        also_update_followup: bool,
    ) -> EngineResult<TransitionPlan> {
        if also_update_followup {
            tracing::debug!(prescription = %number, "follow-up flag update requested alongside abort");
        }
        self.change_prescription_status(number, PrescriptionStatus::Aborted)
    }

    /// Generates (or returns) the copayment invoice for a prescription.
    pub fn generate_invoice(&self, number: &PrescriptionNumber) -> EngineResult<CopaymentInvoice> {
        let record = self.record(number)?;
        self.composer.generate_invoice(record)
    }

    /// Whether the refund control should be offered for a prescription.
    pub fn can_generate_refund(&self, number: &PrescriptionNumber) -> EngineResult<bool> {
        let record = self.record(number)?;
        Ok(self.composer.can_generate_refund(record))
    }

    /// Generates the refund correction letter for a prescription.
    pub fn generate_refund(&self, number: &PrescriptionNumber) -> EngineResult<RefundLetter> {
        let record = self.record(number)?;
        self.composer.generate_refund(record)
    }

    /// The authoritative settlement view for a prescription.
    pub fn settlement_view(&self, number: &PrescriptionNumber) -> EngineResult<SettlementView> {
        let record = self.record(number)?;
        self.composer.settlement_view(record)
    }

    /// The original invoice view (cross-navigation after a refund).
    pub fn invoice_view(&self, number: &PrescriptionNumber) -> EngineResult<CopaymentInvoice> {
        let record = self.record(number)?;
        self.composer.invoice_view(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use rust_decimal_macros::dec;

    fn service() -> PracticeService {
        let cfg = Arc::new(
            CoreConfig::new(None, "Physio Practice".into()).expect("valid config"),
        );
        PracticeService::new(cfg).expect("demo service")
    }

    fn number(s: &str) -> PrescriptionNumber {
        PrescriptionNumber::new(s).expect("valid prescription number")
    }

    #[test]
    fn overview_layers_overrides_on_base_records() {
        let service = service();
        let vo = number("VO-2024-0121");

        service
            .change_prescription_status(&vo, PrescriptionStatus::Billed)
            .expect("transition");

        let overview = service.overview().expect("overview");
        let row = overview
            .iter()
            .find(|row| row.number == vo)
            .expect("row present");
        assert_eq!(row.status, PrescriptionStatus::Billed);
        // Billed auto-settles the insurance side.
        assert_eq!(
            row.insurance_billing_status,
            Some(InsuranceBillingStatus::Paid)
        );
    }

    #[test]
    fn exempt_rows_render_not_applicable_rather_than_empty() {
        let service = service();
        let overview = service.overview().expect("overview");

        let exempt_row = overview
            .iter()
            .find(|row| row.number == number("VO-2024-0139"))
            .expect("exempt demo row");
        assert_eq!(
            exempt_row.copayment_billing,
            EffectiveCopaymentStatus::NotApplicable
        );

        let unset_row = overview
            .iter()
            .find(|row| row.number == number("VO-2024-0150"))
            .expect("billable demo row without status");
        assert_eq!(unset_row.copayment_billing, EffectiveCopaymentStatus::Unset);
    }

    #[test]
    fn abort_hook_funnels_into_the_rule_engine() {
        let service = service();
        let vo = number("VO-2024-0117");

        let plan = service
            .mark_as_aborted(&vo, true)
            .expect("abort hook");
        assert_eq!(plan.primary, PrescriptionStatus::Aborted);
        assert_eq!(plan.derived.len(), 1);

        let overview = service.overview().expect("overview");
        let row = overview
            .iter()
            .find(|row| row.number == vo)
            .expect("row present");
        assert_eq!(row.status, PrescriptionStatus::Aborted);
        assert_eq!(
            row.copayment_billing,
            EffectiveCopaymentStatus::Status(CopaymentBillingStatus::ForRefund)
        );
    }

    #[test]
    fn refund_flow_end_to_end_on_demo_data() {
        let service = service();
        // VO-2024-0117 ships with a generated invoice over 8 × 25.00.
        let vo = number("VO-2024-0117");

        assert!(service.can_generate_refund(&vo).expect("guard"));
        let letter = service.generate_refund(&vo).expect("refund");
        assert_eq!(letter.original_copayment, dec!(30.00));
        assert_eq!(letter.actual_copayment, dec!(17.50));
        assert_eq!(letter.refund_amount, dec!(12.50));
        assert_eq!(letter.practice_name, "Physio Practice");

        assert!(!service.can_generate_refund(&vo).expect("guard after refund"));
        match service.settlement_view(&vo).expect("authoritative view") {
            SettlementView::Refund(refund) => {
                assert_eq!(refund.refund_invoice_number.as_str(), "CP-VO-2024-0117-R");
            }
            other => panic!("expected refund view, got {other:?}"),
        }
        // Cross-navigation back to the invoice still works.
        let invoice = service.invoice_view(&vo).expect("invoice view");
        assert_eq!(invoice.copayment_total, dec!(30.00));
    }

    #[test]
    fn unknown_prescriptions_are_rejected_before_any_state_change() {
        let service = service();
        let err = service
            .change_prescription_status(&number("VO-404"), PrescriptionStatus::Billed)
            .expect_err("unknown number");
        assert!(matches!(err, EngineError::UnknownPrescription(_)));
    }
}
