//! Settlement document composition.
//!
//! Decides which settlement view (original copayment invoice or refund
//! correction letter) is authoritative for a prescription, and assembles the
//! values each view needs. The composer owns the per-prescription settlement
//! ledger: the copayment documents generated during the session, seeded from
//! the base records at startup.
//!
//! The view state machine is monotonic and forward-only:
//! `NoDocument → DocumentGenerated → RefundGenerated`. There is no "undo
//! refund". From `RefundGenerated` both documents stay viewable, but only the
//! refund is authoritative.

use crate::copayment::{refund_breakdown, round_currency, statutory_copayment, BASE_FEE};
use crate::error::{CalculatorAnomaly, EngineError, EngineResult};
use crate::records::{CopaymentInfo, CopaymentProfile, Prescription, RefundRecord};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;
use vo_types::{InvoiceNumber, PrescriptionNumber};

/// Settlement progress of a copayment-liable prescription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementStage {
    NoDocument,
    DocumentGenerated,
    RefundGenerated,
}

/// Data for rendering a copayment invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopaymentInvoice {
    pub practice_name: String,
    pub prescription_number: PrescriptionNumber,
    pub patient_name: String,
    pub treatment_label: String,
    pub invoice_number: InvoiceNumber,
    pub issued_on: NaiveDate,
    /// Treatment count the invoice was computed from (the prescribed count).
    pub treatments_billed: u32,
    pub amount_per_treatment: Decimal,
    /// Total treatment cost line, rounded for display.
    pub treatment_cost: Decimal,
    /// Statutory flat fee line.
    pub base_fee: Decimal,
    /// Ten-percent share line, derived as `total − base fee` so the printed
    /// lines always sum to the invoiced total.
    pub cost_share: Decimal,
    /// The invoiced copayment total (the authoritative snapshot).
    pub copayment_total: Decimal,
}

/// Data for rendering a refund correction letter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundLetter {
    pub practice_name: String,
    pub prescription_number: PrescriptionNumber,
    pub patient_name: String,
    pub treatment_label: String,
    pub refund_invoice_number: InvoiceNumber,
    pub original_invoice_number: InvoiceNumber,
    pub issued_on: NaiveDate,
    pub prescribed_treatments: u32,
    pub completed_treatments: u32,
    /// The originally invoiced copayment (snapshot from the invoice).
    pub original_copayment: Decimal,
    /// The copayment actually owed after early termination.
    pub actual_copayment: Decimal,
    /// Amount returned to the patient.
    pub refund_amount: Decimal,
}

/// The authoritative settlement view for a prescription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementView {
    Invoice(CopaymentInvoice),
    Refund(RefundLetter),
}

/// Builds copayment invoices and refund correction letters, and tracks which
/// view is authoritative per prescription.
#[derive(Debug)]
pub struct SettlementComposer {
    practice_name: String,
    ledger: RwLock<HashMap<PrescriptionNumber, CopaymentProfile>>,
}

impl SettlementComposer {
    /// Creates a composer seeded with the copayment state of the given base
    /// records.
    pub fn new(practice_name: impl Into<String>, records: &[Prescription]) -> Self {
        let ledger = records
            .iter()
            .map(|record| (record.number.clone(), record.copayment.clone()))
            .collect();
        Self {
            practice_name: practice_name.into(),
            ledger: RwLock::new(ledger),
        }
    }

    /// Current copayment state for a prescription, as tracked by the ledger.
    pub fn copayment_profile(&self, number: &PrescriptionNumber) -> EngineResult<CopaymentProfile> {
        let guard = self.ledger.read().map_err(|_| EngineError::LockPoisoned)?;
        guard
            .get(number)
            .cloned()
            .ok_or_else(|| EngineError::UnknownPrescription(number.to_string()))
    }

    /// Settlement stage of a copayment-liable prescription.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CopaymentNotApplicable`] for exempt patients.
    pub fn settlement_stage(&self, number: &PrescriptionNumber) -> EngineResult<SettlementStage> {
        match self.copayment_profile(number)? {
            CopaymentProfile::Exempt => Err(EngineError::CopaymentNotApplicable),
            CopaymentProfile::Billable { info: None, .. } => Ok(SettlementStage::NoDocument),
            CopaymentProfile::Billable {
                info: Some(info), ..
            } => {
                if info.refund_generated() {
                    Ok(SettlementStage::RefundGenerated)
                } else {
                    Ok(SettlementStage::DocumentGenerated)
                }
            }
        }
    }

    /// Generates the copayment invoice for a prescription, creating the
    /// copayment document on first call.
    ///
    /// The invoiced amount is computed once, from the prescribed treatment
    /// count, and snapshotted as the authoritative original copayment. A
    /// repeat call returns the existing document unchanged; it never
    /// recomputes or reissues.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CopaymentNotApplicable`] for exempt patients.
    pub fn generate_invoice(&self, prescription: &Prescription) -> EngineResult<CopaymentInvoice> {
        let mut guard = self.ledger.write().map_err(|_| EngineError::LockPoisoned)?;
        let profile = guard
            .get_mut(&prescription.number)
            .ok_or_else(|| EngineError::UnknownPrescription(prescription.number.to_string()))?;

        let (billing_status, info) = match profile {
            CopaymentProfile::Exempt => return Err(EngineError::CopaymentNotApplicable),
            CopaymentProfile::Billable {
                billing_status,
                info,
            } => (*billing_status, info.clone()),
        };

        let info = match info {
            Some(existing) => existing,
            None => {
                let amount = round_currency(statutory_copayment(
                    prescription.prescribed_treatments,
                    prescription.amount_per_treatment,
                ));
                let created = CopaymentInfo {
                    invoice_number: InvoiceNumber::for_copayment(&prescription.number),
                    issued_on: Utc::now().date_naive(),
                    amount,
                    refund: None,
                };
                *profile = CopaymentProfile::Billable {
                    billing_status,
                    info: Some(created.clone()),
                };
                tracing::info!(
                    prescription = %prescription.number,
                    invoice = %created.invoice_number,
                    "generated copayment invoice"
                );
                created
            }
        };

        Ok(self.invoice_from(prescription, &info))
    }

    /// Whether a refund correction can be generated right now: a copayment
    /// document exists, no refund exists yet, and the course was interrupted
    /// after at least one treatment. A state-machine guard, not a calculator
    /// concern; ineligibility is never an error.
    pub fn can_generate_refund(&self, prescription: &Prescription) -> bool {
        let Ok(profile) = self.copayment_profile(&prescription.number) else {
            return false;
        };
        match profile.info() {
            Some(info) => !info.refund_generated() && prescription.course_interrupted(),
            None => false,
        }
    }

    /// Generates the refund correction for an interrupted course.
    ///
    /// The original copayment is taken from the invoice snapshot; only the
    /// actual copayment is computed from the current completed count. Mints
    /// `<original invoice number>-R`, stamps the current date, and writes the
    /// refund fields exactly once. The guard is re-checked under the ledger's
    /// write lock immediately before writing.
    ///
    /// # Errors
    ///
    /// - [`EngineError::CopaymentNotApplicable`] for exempt patients
    /// - [`EngineError::NoDocument`] if no invoice exists yet
    /// - [`EngineError::RefundNotEligible`] if a refund already exists or the
    ///   course is not interrupted
    /// - [`CalculatorAnomaly::NegativeRefund`] if upstream data would produce
    ///   a negative amount
    pub fn generate_refund(&self, prescription: &Prescription) -> EngineResult<RefundLetter> {
        let mut guard = self.ledger.write().map_err(|_| EngineError::LockPoisoned)?;
        let profile = guard
            .get_mut(&prescription.number)
            .ok_or_else(|| EngineError::UnknownPrescription(prescription.number.to_string()))?;

        let (billing_status, info) = match profile {
            CopaymentProfile::Exempt => return Err(EngineError::CopaymentNotApplicable),
            CopaymentProfile::Billable {
                billing_status,
                info,
            } => (*billing_status, info.clone()),
        };
        let info = info.ok_or(EngineError::NoDocument)?;

        if info.refund_generated() || !prescription.course_interrupted() {
            return Err(EngineError::RefundNotEligible);
        }

        let breakdown = refund_breakdown(
            prescription.prescribed_treatments,
            prescription.completed_treatments,
            prescription.amount_per_treatment,
        )?;
        let actual = round_currency(breakdown.actual);
        let refund_amount = info.amount - actual;
        if refund_amount.is_sign_negative() {
            return Err(CalculatorAnomaly::NegativeRefund {
                prescribed: prescription.prescribed_treatments,
                completed: prescription.completed_treatments,
            }
            .into());
        }

        let refund = RefundRecord {
            invoice_number: info.invoice_number.refund_variant(),
            issued_on: Utc::now().date_naive(),
            amount: refund_amount,
            actual_copayment: actual,
        };

        let updated = CopaymentInfo {
            refund: Some(refund.clone()),
            ..info.clone()
        };
        *profile = CopaymentProfile::Billable {
            billing_status,
            info: Some(updated),
        };

        tracing::info!(
            prescription = %prescription.number,
            refund_invoice = %refund.invoice_number,
            amount = %refund.amount,
            "generated refund correction"
        );

        Ok(self.refund_letter_from(prescription, &info, &refund))
    }

    /// The authoritative settlement view: the refund correction once one
    /// exists, else the invoice.
    ///
    /// # Errors
    ///
    /// - [`EngineError::CopaymentNotApplicable`] for exempt patients
    /// - [`EngineError::NoDocument`] before any document exists
    pub fn settlement_view(&self, prescription: &Prescription) -> EngineResult<SettlementView> {
        let profile = self.copayment_profile(&prescription.number)?;
        match &profile {
            CopaymentProfile::Exempt => Err(EngineError::CopaymentNotApplicable),
            CopaymentProfile::Billable { info: None, .. } => Err(EngineError::NoDocument),
            CopaymentProfile::Billable {
                info: Some(info), ..
            } => match &info.refund {
                Some(refund) => Ok(SettlementView::Refund(
                    self.refund_letter_from(prescription, info, refund),
                )),
                None => Ok(SettlementView::Invoice(
                    self.invoice_from(prescription, info),
                )),
            },
        }
    }

    /// The original invoice view, which stays reachable for cross-navigation
    /// after a refund has been generated (it is just no longer
    /// authoritative).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::settlement_view`].
    pub fn invoice_view(&self, prescription: &Prescription) -> EngineResult<CopaymentInvoice> {
        let profile = self.copayment_profile(&prescription.number)?;
        match &profile {
            CopaymentProfile::Exempt => Err(EngineError::CopaymentNotApplicable),
            CopaymentProfile::Billable { info: None, .. } => Err(EngineError::NoDocument),
            CopaymentProfile::Billable {
                info: Some(info), ..
            } => Ok(self.invoice_from(prescription, info)),
        }
    }

    fn invoice_from(&self, prescription: &Prescription, info: &CopaymentInfo) -> CopaymentInvoice {
        let treatment_cost = round_currency(
            Decimal::from(prescription.prescribed_treatments) * prescription.amount_per_treatment,
        );
        CopaymentInvoice {
            practice_name: self.practice_name.clone(),
            prescription_number: prescription.number.clone(),
            patient_name: prescription.patient_name.clone(),
            treatment_label: prescription.treatment_label.clone(),
            invoice_number: info.invoice_number.clone(),
            issued_on: info.issued_on,
            treatments_billed: prescription.prescribed_treatments,
            amount_per_treatment: round_currency(prescription.amount_per_treatment),
            treatment_cost,
            base_fee: round_currency(BASE_FEE),
            cost_share: info.amount - round_currency(BASE_FEE),
            copayment_total: info.amount,
        }
    }

    fn refund_letter_from(
        &self,
        prescription: &Prescription,
        info: &CopaymentInfo,
        refund: &RefundRecord,
    ) -> RefundLetter {
        RefundLetter {
            practice_name: self.practice_name.clone(),
            prescription_number: prescription.number.clone(),
            patient_name: prescription.patient_name.clone(),
            treatment_label: prescription.treatment_label.clone(),
            refund_invoice_number: refund.invoice_number.clone(),
            original_invoice_number: info.invoice_number.clone(),
            issued_on: refund.issued_on,
            prescribed_treatments: prescription.prescribed_treatments,
            completed_treatments: prescription.completed_treatments,
            original_copayment: info.amount,
            actual_copayment: refund.actual_copayment,
            refund_amount: refund.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PrescriptionStatus;
    use rust_decimal_macros::dec;

    fn billable(number: &str, prescribed: u32, completed: u32) -> Prescription {
        Prescription {
            number: PrescriptionNumber::new(number).expect("valid number"),
            patient_name: "Jo Miller".into(),
            treatment_label: "Manual therapy".into(),
            prescribed_treatments: prescribed,
            completed_treatments: completed,
            amount_per_treatment: dec!(25.00),
            status: PrescriptionStatus::Active,
            insurance_billing_status: None,
            copayment: CopaymentProfile::Billable {
                billing_status: None,
                info: None,
            },
        }
    }

    fn exempt(number: &str) -> Prescription {
        Prescription {
            copayment: CopaymentProfile::Exempt,
            ..billable(number, 8, 3)
        }
    }

    fn composer_for(records: &[Prescription]) -> SettlementComposer {
        SettlementComposer::new("Physio Practice", records)
    }

    #[test]
    fn invoice_snapshots_the_original_copayment() {
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));

        let invoice = composer.generate_invoice(&vo).expect("first invoice");
        assert_eq!(invoice.invoice_number.as_str(), "CP-VO-1");
        assert_eq!(invoice.copayment_total, dec!(30.00));
        assert_eq!(invoice.base_fee, dec!(10.00));
        assert_eq!(invoice.cost_share, dec!(20.00));
        assert_eq!(invoice.treatment_cost, dec!(200.00));
        assert_eq!(
            composer
                .settlement_stage(&vo.number)
                .expect("stage after invoice"),
            SettlementStage::DocumentGenerated
        );
    }

    #[test]
    fn repeat_invoice_calls_return_the_existing_document() {
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));

        let first = composer.generate_invoice(&vo).expect("first invoice");
        let second = composer.generate_invoice(&vo).expect("repeat invoice");
        assert_eq!(first, second);
    }

    #[test]
    fn refund_guard_boundaries_are_independent() {
        // No document yet.
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));
        assert!(!composer.can_generate_refund(&vo));

        // Document exists but no treatment was carried out.
        let vo = billable("VO-2", 8, 0);
        let composer = composer_for(std::slice::from_ref(&vo));
        composer.generate_invoice(&vo).expect("invoice");
        assert!(!composer.can_generate_refund(&vo));

        // Document exists but the course completed in full.
        let vo = billable("VO-3", 8, 8);
        let composer = composer_for(std::slice::from_ref(&vo));
        composer.generate_invoice(&vo).expect("invoice");
        assert!(!composer.can_generate_refund(&vo));
    }

    #[test]
    fn exempt_patients_never_pass_the_guard() {
        let vo = exempt("VO-1");
        let composer = composer_for(std::slice::from_ref(&vo));
        assert!(!composer.can_generate_refund(&vo));

        let err = composer
            .generate_invoice(&vo)
            .expect_err("no invoice for exempt patients");
        assert!(matches!(err, EngineError::CopaymentNotApplicable));
        let err = composer
            .settlement_stage(&vo.number)
            .expect_err("no stage for exempt patients");
        assert!(matches!(err, EngineError::CopaymentNotApplicable));
    }

    #[test]
    fn refund_letter_carries_the_pro_rated_amounts() {
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));
        composer.generate_invoice(&vo).expect("invoice");

        assert!(composer.can_generate_refund(&vo));
        let letter = composer.generate_refund(&vo).expect("refund");
        assert_eq!(letter.refund_invoice_number.as_str(), "CP-VO-1-R");
        assert_eq!(letter.original_copayment, dec!(30.00));
        assert_eq!(letter.actual_copayment, dec!(17.50));
        assert_eq!(letter.refund_amount, dec!(12.50));
    }

    #[test]
    fn refund_is_generatable_at_most_once() {
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));
        composer.generate_invoice(&vo).expect("invoice");
        composer.generate_refund(&vo).expect("first refund");

        assert!(!composer.can_generate_refund(&vo));
        let err = composer
            .generate_refund(&vo)
            .expect_err("second refund must be refused");
        assert!(matches!(err, EngineError::RefundNotEligible));

        // Intervening reads do not reopen the guard.
        composer
            .settlement_view(&vo)
            .expect("view after refund");
        assert!(!composer.can_generate_refund(&vo));
    }

    #[test]
    fn refund_without_a_document_is_refused() {
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));

        let err = composer
            .generate_refund(&vo)
            .expect_err("no document yet");
        assert!(matches!(err, EngineError::NoDocument));
    }

    #[test]
    fn refund_uses_the_invoice_snapshot_as_baseline() {
        // Base record arrives with an already-generated document whose
        // invoiced amount differs from what today's counts would produce.
        let mut vo = billable("VO-1", 8, 3);
        vo.copayment = CopaymentProfile::Billable {
            billing_status: None,
            info: Some(CopaymentInfo {
                invoice_number: InvoiceNumber::new("CP-VO-1").expect("valid invoice number"),
                issued_on: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
                amount: dec!(32.00),
                refund: None,
            }),
        };
        let composer = composer_for(std::slice::from_ref(&vo));

        let letter = composer.generate_refund(&vo).expect("refund");
        assert_eq!(letter.original_copayment, dec!(32.00));
        assert_eq!(letter.refund_amount, dec!(14.50));
    }

    #[test]
    fn refund_view_is_authoritative_but_invoice_stays_reachable() {
        let vo = billable("VO-1", 8, 3);
        let composer = composer_for(std::slice::from_ref(&vo));

        let err = composer
            .settlement_view(&vo)
            .expect_err("nothing to view yet");
        assert!(matches!(err, EngineError::NoDocument));

        composer.generate_invoice(&vo).expect("invoice");
        match composer.settlement_view(&vo).expect("invoice view") {
            SettlementView::Invoice(invoice) => {
                assert_eq!(invoice.copayment_total, dec!(30.00));
            }
            other => panic!("expected invoice view, got {other:?}"),
        }

        composer.generate_refund(&vo).expect("refund");
        match composer.settlement_view(&vo).expect("refund view") {
            SettlementView::Refund(letter) => {
                assert_eq!(letter.refund_amount, dec!(12.50));
            }
            other => panic!("expected refund view, got {other:?}"),
        }

        let invoice = composer
            .invoice_view(&vo)
            .expect("cross-navigation to the invoice");
        assert_eq!(invoice.copayment_total, dec!(30.00));
        assert_eq!(
            composer.settlement_stage(&vo.number).expect("stage"),
            SettlementStage::RefundGenerated
        );
    }
}
