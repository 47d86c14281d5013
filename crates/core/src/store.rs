//! Session-wide status override store.
//!
//! Holds, per prescription number, the most recent values for the three
//! status dimensions, defaulting to the base record's own value until
//! overridden. The store is constructor-injected wherever it is needed so
//! tests can run against isolated instances; it is never an ambient
//! singleton.
//!
//! The underlying record is never mutated: the store shadows individual
//! fields by key. Key presence marks an override, so clearing a dimension
//! (writing `None`) is distinct from never having overridden it.
//!
//! All three maps sit behind a single `RwLock` so that a compound write
//! (primary status plus its derived changes) is applied under one critical
//! section and no reader can observe the primary without its mandated
//! derived writes.

use crate::error::{EngineError, EngineResult};
use crate::rules::{DerivedChange, TransitionPlan};
use crate::status::{CopaymentBillingStatus, InsuranceBillingStatus, PrescriptionStatus};
use std::collections::HashMap;
use std::sync::RwLock;
use vo_types::PrescriptionNumber;

#[derive(Debug, Default)]
struct Overrides {
    prescription: HashMap<PrescriptionNumber, PrescriptionStatus>,
    insurance: HashMap<PrescriptionNumber, Option<InsuranceBillingStatus>>,
    copayment: HashMap<PrescriptionNumber, Option<CopaymentBillingStatus>>,
}

/// Process-wide holder of status overrides, keyed by prescription number.
///
/// Initialized empty; grows monotonically for the session. No eviction at
/// prototype scale.
#[derive(Debug, Default)]
pub struct StatusStore {
    inner: RwLock<Overrides>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current prescription status: the override if one exists, else the
    /// caller-supplied fallback (the base record's value). Side-effect-free.
    pub fn prescription_status(
        &self,
        number: &PrescriptionNumber,
        fallback: PrescriptionStatus,
    ) -> EngineResult<PrescriptionStatus> {
        let guard = self.inner.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(guard.prescription.get(number).copied().unwrap_or(fallback))
    }

    /// Current insurer-side billing status, with fallback.
    pub fn insurance_billing_status(
        &self,
        number: &PrescriptionNumber,
        fallback: Option<InsuranceBillingStatus>,
    ) -> EngineResult<Option<InsuranceBillingStatus>> {
        let guard = self.inner.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(guard.insurance.get(number).copied().unwrap_or(fallback))
    }

    /// Current patient-side copayment billing status, with fallback.
    ///
    /// The store does not know about exemption; callers must only consult
    /// this dimension for copayment-liable prescriptions.
    pub fn copayment_billing_status(
        &self,
        number: &PrescriptionNumber,
        fallback: Option<CopaymentBillingStatus>,
    ) -> EngineResult<Option<CopaymentBillingStatus>> {
        let guard = self.inner.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(guard.copayment.get(number).copied().unwrap_or(fallback))
    }

    /// Records a prescription status override. No validation happens here;
    /// validation is the rule engine's job.
    pub fn set_prescription_status(
        &self,
        number: &PrescriptionNumber,
        value: PrescriptionStatus,
    ) -> EngineResult<()> {
        let mut guard = self.inner.write().map_err(|_| EngineError::LockPoisoned)?;
        guard.prescription.insert(number.clone(), value);
        Ok(())
    }

    /// Records an insurer-side billing override. Writing `None` clears the
    /// dimension and still counts as an override.
    pub fn set_insurance_billing_status(
        &self,
        number: &PrescriptionNumber,
        value: Option<InsuranceBillingStatus>,
    ) -> EngineResult<()> {
        let mut guard = self.inner.write().map_err(|_| EngineError::LockPoisoned)?;
        guard.insurance.insert(number.clone(), value);
        Ok(())
    }

    /// Records a patient-side copayment billing override.
    pub fn set_copayment_billing_status(
        &self,
        number: &PrescriptionNumber,
        value: Option<CopaymentBillingStatus>,
    ) -> EngineResult<()> {
        let mut guard = self.inner.write().map_err(|_| EngineError::LockPoisoned)?;
        guard.copayment.insert(number.clone(), value);
        Ok(())
    }

    /// Applies a transition plan (the primary prescription-status write plus
    /// every derived write) under a single write guard, so readers observe
    /// the compound update as one unit.
    pub fn apply(&self, number: &PrescriptionNumber, plan: &TransitionPlan) -> EngineResult<()> {
        let mut guard = self.inner.write().map_err(|_| EngineError::LockPoisoned)?;
        guard.prescription.insert(number.clone(), plan.primary);
        for change in &plan.derived {
            match change {
                DerivedChange::InsuranceBilling(value) => {
                    guard.insurance.insert(number.clone(), *value);
                }
                DerivedChange::CopaymentBilling(value) => {
                    guard.copayment.insert(number.clone(), *value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(s: &str) -> PrescriptionNumber {
        PrescriptionNumber::new(s).expect("valid prescription number")
    }

    #[test]
    fn falls_back_to_the_base_value_until_overridden() {
        let store = StatusStore::new();
        let vo = number("VO-1");

        let current = store
            .prescription_status(&vo, PrescriptionStatus::Active)
            .expect("read");
        assert_eq!(current, PrescriptionStatus::Active);

        store
            .set_prescription_status(&vo, PrescriptionStatus::Billed)
            .expect("write");
        let current = store
            .prescription_status(&vo, PrescriptionStatus::Active)
            .expect("read");
        assert_eq!(current, PrescriptionStatus::Billed);
    }

    #[test]
    fn repeated_reads_without_writes_are_identical() {
        let store = StatusStore::new();
        let vo = number("VO-1");
        store
            .set_insurance_billing_status(&vo, Some(InsuranceBillingStatus::Sent))
            .expect("write");

        let first = store
            .insurance_billing_status(&vo, None)
            .expect("first read");
        let second = store
            .insurance_billing_status(&vo, None)
            .expect("second read");
        assert_eq!(first, second);
        assert_eq!(first, Some(InsuranceBillingStatus::Sent));
    }

    #[test]
    fn clearing_a_dimension_is_distinct_from_no_override() {
        let store = StatusStore::new();
        let vo = number("VO-1");
        let fallback = Some(InsuranceBillingStatus::ReadyToSend);

        // No override yet: the fallback shows through.
        assert_eq!(
            store
                .insurance_billing_status(&vo, fallback)
                .expect("read"),
            fallback
        );

        // Explicitly cleared: the override wins over the fallback.
        store
            .set_insurance_billing_status(&vo, None)
            .expect("write");
        assert_eq!(
            store
                .insurance_billing_status(&vo, fallback)
                .expect("read"),
            None
        );
    }

    #[test]
    fn overrides_are_isolated_per_prescription() {
        let store = StatusStore::new();
        store
            .set_prescription_status(&number("VO-1"), PrescriptionStatus::Aborted)
            .expect("write");

        let untouched = store
            .prescription_status(&number("VO-2"), PrescriptionStatus::Active)
            .expect("read");
        assert_eq!(untouched, PrescriptionStatus::Active);
    }
}
