//! Domain-level prescription records.
//!
//! These are the immutable base records supplied by the record source. The
//! status store layers the session's status overrides on top of them and the
//! settlement composer keeps its own copy of the copayment side; nothing in
//! the engine mutates a base record after load.

use crate::status::{CopaymentBillingStatus, InsuranceBillingStatus, PrescriptionStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use vo_types::{InvoiceNumber, PrescriptionNumber};

/// A prescription (VO): a medical treatment order with a fixed number of
/// prescribed sessions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prescription {
    /// Unique prescription number, stable across the system.
    pub number: PrescriptionNumber,

    /// Patient display name for tables and letters.
    pub patient_name: String,

    /// Prescribed treatment kind (for example "Manual therapy").
    pub treatment_label: String,

    /// Number of treatments the prescription orders.
    pub prescribed_treatments: u32,

    /// Number of treatments carried out so far.
    pub completed_treatments: u32,

    /// Cost of a single treatment session.
    pub amount_per_treatment: Decimal,

    /// Base treatment lifecycle status.
    pub status: PrescriptionStatus,

    /// Base insurer-side billing status, if any.
    pub insurance_billing_status: Option<InsuranceBillingStatus>,

    /// Copayment side of the prescription.
    pub copayment: CopaymentProfile,
}

impl Prescription {
    /// Whether the course stopped short of the prescribed count after at
    /// least one treatment, which is what makes a refund correction possible.
    pub fn course_interrupted(&self) -> bool {
        self.completed_treatments >= 1 && self.completed_treatments < self.prescribed_treatments
    }
}

/// Copayment applicability for a prescription.
///
/// "Not applicable" (exempt patient) and "applicable but no document
/// generated yet" are distinct states; consumers must never conflate an
/// exempt patient with an empty copayment status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopaymentProfile {
    /// The patient is exempt from copayment obligations; every copayment
    /// field renders as "not applicable".
    Exempt,
    /// The patient owes the statutory copayment.
    Billable {
        /// Base patient-side billing status, if any.
        billing_status: Option<CopaymentBillingStatus>,
        /// Present once a copayment document has been generated.
        info: Option<CopaymentInfo>,
    },
}

impl CopaymentProfile {
    pub fn is_exempt(&self) -> bool {
        matches!(self, CopaymentProfile::Exempt)
    }

    /// Base copayment billing status, for use as a store fallback.
    /// `None` for exempt patients as well as for billable ones without a
    /// status; the caller distinguishes the two via [`Self::is_exempt`].
    pub fn base_billing_status(&self) -> Option<CopaymentBillingStatus> {
        match self {
            CopaymentProfile::Exempt => None,
            CopaymentProfile::Billable { billing_status, .. } => *billing_status,
        }
    }

    /// The copayment document, if one has been generated.
    pub fn info(&self) -> Option<&CopaymentInfo> {
        match self {
            CopaymentProfile::Exempt => None,
            CopaymentProfile::Billable { info, .. } => info.as_ref(),
        }
    }
}

/// Copayment document data, created the first time a copayment invoice is
/// generated for a prescription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopaymentInfo {
    /// Invoice number, derived from the prescription number.
    pub invoice_number: InvoiceNumber,

    /// Date the invoice was generated.
    pub issued_on: NaiveDate,

    /// The invoiced copayment amount, two-decimal currency precision.
    ///
    /// This is the authoritative snapshot of the original copayment; refund
    /// corrections use it as their baseline instead of recomputing from
    /// treatment counts that may have changed since invoicing.
    pub amount: Decimal,

    /// Refund correction data, populated exactly once when a refund is
    /// generated and frozen afterwards.
    pub refund: Option<RefundRecord>,
}

impl CopaymentInfo {
    /// Whether a refund correction has been generated for this document.
    pub fn refund_generated(&self) -> bool {
        self.refund.is_some()
    }
}

/// Refund correction data. Immutable display data once written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundRecord {
    /// Refund invoice number: `<original invoice number>-R`.
    pub invoice_number: InvoiceNumber,

    /// Date the refund correction was generated.
    pub issued_on: NaiveDate,

    /// Amount returned to the patient, two-decimal currency precision.
    pub amount: Decimal,

    /// The copayment actually owed after early termination,
    /// two-decimal currency precision.
    pub actual_copayment: Decimal,
}
