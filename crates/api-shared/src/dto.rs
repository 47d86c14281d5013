//! Wire types for the REST API.
//!
//! These are flat serialization structs: statuses travel as their snake_case
//! string values, dates as ISO-8601 strings, and monetary amounts as
//! two-decimal strings, so clients never depend on this crate's internals.
//! Parsing back into domain types (and rejecting unknown values) happens in
//! the handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// One dashboard row.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionSummary {
    pub number: String,
    pub patient_name: String,
    pub treatment_label: String,
    pub completed_treatments: u32,
    pub prescribed_treatments: u32,
    /// Cost of a single treatment, two-decimal string.
    pub amount_per_treatment: String,
    pub status: String,
    /// Insurer-side billing status; absent when the dimension is empty.
    pub insurance_billing_status: Option<String>,
    /// Patient-side copayment status: a status value, `"none"` when empty,
    /// or `"not_applicable"` for exempt patients.
    pub copayment_billing_status: String,
    /// Whether the refund control should be offered for this row.
    pub refund_available: bool,
}

/// Response for listing all prescriptions.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPrescriptionsRes {
    pub prescriptions: Vec<PrescriptionSummary>,
}

/// Request to change the prescription status.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePrescriptionStatusReq {
    /// New prescription status (snake_case value).
    pub status: String,
}

/// A derived status write applied alongside a primary status change.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DerivedChangeDto {
    /// The dimension that was additionally written.
    pub dimension: String,
    /// The written value; absent when the dimension was cleared.
    pub status: Option<String>,
}

/// Response after a prescription status change.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePrescriptionStatusRes {
    pub status: String,
    /// Cross-field writes that were applied together with the primary one.
    pub derived_changes: Vec<DerivedChangeDto>,
}

/// Request to change one of the billing status dimensions. An absent or
/// empty value clears the dimension.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeBillingStatusReq {
    #[serde(default)]
    pub status: Option<String>,
}

/// Generic success response for direct writes.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeBillingStatusRes {
    pub success: bool,
}

/// Request body for the abort hook.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAbortedReq {
    /// Whether the follow-up queue entry should be updated as well
    /// (handled outside the settlement engine).
    #[serde(default)]
    pub update_followup: bool,
}

/// Copayment invoice view.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CopaymentInvoiceRes {
    pub practice_name: String,
    pub prescription_number: String,
    pub patient_name: String,
    pub treatment_label: String,
    pub invoice_number: String,
    /// ISO-8601 date the invoice was generated.
    pub issued_on: String,
    pub treatments_billed: u32,
    pub amount_per_treatment: String,
    pub treatment_cost: String,
    pub base_fee: String,
    pub cost_share: String,
    pub copayment_total: String,
}

/// Refund correction letter view.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RefundLetterRes {
    pub practice_name: String,
    pub prescription_number: String,
    pub patient_name: String,
    pub treatment_label: String,
    pub refund_invoice_number: String,
    pub original_invoice_number: String,
    /// ISO-8601 date the refund correction was generated.
    pub issued_on: String,
    pub prescribed_treatments: u32,
    pub completed_treatments: u32,
    pub original_copayment: String,
    pub actual_copayment: String,
    pub refund_amount: String,
}

/// The authoritative settlement view for a prescription. Exactly one of
/// `invoice` and `refund` is present, matching `kind`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SettlementViewRes {
    /// `"invoice"` or `"refund"`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<CopaymentInvoiceRes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundLetterRes>,
}
