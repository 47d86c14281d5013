//! Transition rule engine.
//!
//! Applies a requested status change plus any mandated side-effect changes to
//! the other status dimensions as a single logical update. The cross-field
//! rules live in a pure planning function so the compound-write behaviour is
//! testable without a store or any rendering harness; the engine then applies
//! a plan through the store's single critical section.
//!
//! Rules:
//! - `Billed` also settles the insurer side: a fully billed prescription is
//!   considered paid, whatever the insurance dimension said before.
//! - `Aborted` on a copayment-liable prescription flags the copayment
//!   dimension `ForRefund`: an interrupted course always owes a refund
//!   review. Exempt patients have no copayment to refund, so their copayment
//!   dimension is never touched.
//!
//! Both side effects are evaluated against the pre-change prescription
//! context, never against the just-written status. The planner is a total
//! function over valid inputs; enum validity is enforced at the boundary.

use crate::error::{EngineError, EngineResult};
use crate::records::Prescription;
use crate::status::{CopaymentBillingStatus, InsuranceBillingStatus, PrescriptionStatus};
use crate::store::StatusStore;
use std::sync::Arc;
use vo_types::PrescriptionNumber;

/// A derived write mandated by a primary status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerivedChange {
    InsuranceBilling(Option<InsuranceBillingStatus>),
    CopaymentBilling(Option<CopaymentBillingStatus>),
}

/// A primary prescription-status write plus its mandated derived writes.
/// Applied atomically by [`StatusStore::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    pub primary: PrescriptionStatus,
    pub derived: Vec<DerivedChange>,
}

/// Plans a prescription-status transition: the primary write plus whichever
/// of the two auto-transition rules fire for this input. Pure; no store
/// access.
pub fn plan_prescription_transition(
    new_status: PrescriptionStatus,
    context: &Prescription,
) -> TransitionPlan {
    let mut derived = Vec::new();

    if new_status == PrescriptionStatus::Billed {
        derived.push(DerivedChange::InsuranceBilling(Some(
            InsuranceBillingStatus::Paid,
        )));
    }

    if new_status == PrescriptionStatus::Aborted && !context.copayment.is_exempt() {
        derived.push(DerivedChange::CopaymentBilling(Some(
            CopaymentBillingStatus::ForRefund,
        )));
    }

    TransitionPlan {
        primary: new_status,
        derived,
    }
}

/// Applies status changes through the store, with cross-field derivation for
/// the prescription dimension and plain writes for the other two.
#[derive(Clone, Debug)]
pub struct TransitionRuleEngine {
    store: Arc<StatusStore>,
}

impl TransitionRuleEngine {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }

    /// Changes the prescription status and applies any mandated derived
    /// writes atomically. Returns the applied plan so consumers can surface
    /// the derived changes.
    pub fn change_prescription_status(
        &self,
        new_status: PrescriptionStatus,
        context: &Prescription,
    ) -> EngineResult<TransitionPlan> {
        let plan = plan_prescription_transition(new_status, context);
        self.store.apply(&context.number, &plan)?;

        tracing::debug!(
            prescription = %context.number,
            status = %plan.primary,
            derived = plan.derived.len(),
            "applied prescription status transition"
        );

        Ok(plan)
    }

    /// Direct insurer-side billing write. No derived side effects.
    pub fn change_insurance_billing_status(
        &self,
        number: &PrescriptionNumber,
        new_status: Option<InsuranceBillingStatus>,
    ) -> EngineResult<()> {
        self.store.set_insurance_billing_status(number, new_status)
    }

    /// Direct patient-side copayment billing write. No derived side effects.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CopaymentNotApplicable`] for exempt patients,
    /// whose copayment dimension is inert.
    pub fn change_copayment_billing_status(
        &self,
        context: &Prescription,
        new_status: Option<CopaymentBillingStatus>,
    ) -> EngineResult<()> {
        if context.copayment.is_exempt() {
            return Err(EngineError::CopaymentNotApplicable);
        }
        self.store
            .set_copayment_billing_status(&context.number, new_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::CopaymentProfile;
    use rust_decimal_macros::dec;

    fn prescription(number: &str, exempt: bool) -> Prescription {
        Prescription {
            number: PrescriptionNumber::new(number).expect("valid number"),
            patient_name: "Jo Miller".into(),
            treatment_label: "Manual therapy".into(),
            prescribed_treatments: 8,
            completed_treatments: 3,
            amount_per_treatment: dec!(25.00),
            status: PrescriptionStatus::Active,
            insurance_billing_status: Some(InsuranceBillingStatus::ForFixing),
            copayment: if exempt {
                CopaymentProfile::Exempt
            } else {
                CopaymentProfile::Billable {
                    billing_status: None,
                    info: None,
                }
            },
        }
    }

    #[test]
    fn billed_plans_an_insurance_paid_write() {
        let plan = plan_prescription_transition(
            PrescriptionStatus::Billed,
            &prescription("VO-1", false),
        );
        assert_eq!(plan.primary, PrescriptionStatus::Billed);
        assert_eq!(
            plan.derived,
            vec![DerivedChange::InsuranceBilling(Some(
                InsuranceBillingStatus::Paid
            ))]
        );
    }

    #[test]
    fn aborting_a_billable_course_plans_a_refund_flag() {
        let plan = plan_prescription_transition(
            PrescriptionStatus::Aborted,
            &prescription("VO-1", false),
        );
        assert_eq!(
            plan.derived,
            vec![DerivedChange::CopaymentBilling(Some(
                CopaymentBillingStatus::ForRefund
            ))]
        );
    }

    #[test]
    fn aborting_an_exempt_course_leaves_copayment_untouched() {
        let plan =
            plan_prescription_transition(PrescriptionStatus::Aborted, &prescription("VO-1", true));
        assert_eq!(plan.primary, PrescriptionStatus::Aborted);
        assert!(plan.derived.is_empty());
    }

    #[test]
    fn plain_transitions_derive_nothing() {
        for status in [
            PrescriptionStatus::Active,
            PrescriptionStatus::TreatmentComplete,
            PrescriptionStatus::Expired,
        ] {
            let plan = plan_prescription_transition(status, &prescription("VO-1", false));
            assert!(plan.derived.is_empty(), "{status} must not derive writes");
        }
    }

    #[test]
    fn billed_overrides_a_previous_for_fixing_status() {
        let store = Arc::new(StatusStore::new());
        let engine = TransitionRuleEngine::new(store.clone());
        let vo = prescription("VO-1", false);

        engine
            .change_insurance_billing_status(&vo.number, Some(InsuranceBillingStatus::ForFixing))
            .expect("direct write");
        engine
            .change_prescription_status(PrescriptionStatus::Billed, &vo)
            .expect("transition");

        let current = store
            .insurance_billing_status(&vo.number, vo.insurance_billing_status)
            .expect("read");
        assert_eq!(current, Some(InsuranceBillingStatus::Paid));
    }

    #[test]
    fn abort_writes_both_dimensions_together() {
        let store = Arc::new(StatusStore::new());
        let engine = TransitionRuleEngine::new(store.clone());
        let vo = prescription("VO-1", false);

        engine
            .change_prescription_status(PrescriptionStatus::Aborted, &vo)
            .expect("transition");

        assert_eq!(
            store
                .prescription_status(&vo.number, vo.status)
                .expect("read"),
            PrescriptionStatus::Aborted
        );
        assert_eq!(
            store
                .copayment_billing_status(&vo.number, None)
                .expect("read"),
            Some(CopaymentBillingStatus::ForRefund)
        );
        // The insurance dimension is not part of the abort rule.
        assert_eq!(
            store
                .insurance_billing_status(&vo.number, vo.insurance_billing_status)
                .expect("read"),
            Some(InsuranceBillingStatus::ForFixing)
        );
    }

    #[test]
    fn abort_on_exempt_only_writes_the_primary_dimension() {
        let store = Arc::new(StatusStore::new());
        let engine = TransitionRuleEngine::new(store.clone());
        let vo = prescription("VO-1", true);

        engine
            .change_prescription_status(PrescriptionStatus::Aborted, &vo)
            .expect("transition");

        assert_eq!(
            store
                .copayment_billing_status(&vo.number, None)
                .expect("read"),
            None
        );
    }

    #[test]
    fn copayment_writes_are_refused_for_exempt_patients() {
        let engine = TransitionRuleEngine::new(Arc::new(StatusStore::new()));
        let vo = prescription("VO-1", true);

        let err = engine
            .change_copayment_billing_status(&vo, Some(CopaymentBillingStatus::Paid))
            .expect_err("exempt patients have no copayment dimension");
        assert!(matches!(err, EngineError::CopaymentNotApplicable));
    }
}
