//! Status enumerations for the three tracking dimensions of a prescription.
//!
//! Each prescription carries three independent status dimensions: the
//! treatment lifecycle, insurance-side billing, and patient-side copayment
//! billing. Values are parsed strictly at the boundary; an unknown string
//! never reaches the rule engine.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three status dimensions tracked per prescription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusDimension {
    Prescription,
    InsuranceBilling,
    CopaymentBilling,
}

impl fmt::Display for StatusDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusDimension::Prescription => "prescription",
            StatusDimension::InsuranceBilling => "insurance billing",
            StatusDimension::CopaymentBilling => "copayment billing",
        };
        write!(f, "{label}")
    }
}

/// Treatment lifecycle state of a prescription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    /// Treatment course is running.
    Active,
    /// Treatment course was interrupted before completion.
    Aborted,
    /// All prescribed treatments were carried out.
    TreatmentComplete,
    /// The course has been billed to the insurer.
    Billed,
    /// The prescription lapsed without completion.
    Expired,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Aborted => "aborted",
            PrescriptionStatus::TreatmentComplete => "treatment_complete",
            PrescriptionStatus::Billed => "billed",
            PrescriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(PrescriptionStatus::Active),
            "aborted" => Ok(PrescriptionStatus::Aborted),
            "treatment_complete" => Ok(PrescriptionStatus::TreatmentComplete),
            "billed" => Ok(PrescriptionStatus::Billed),
            "expired" => Ok(PrescriptionStatus::Expired),
            other => Err(EngineError::UnknownStatus {
                dimension: StatusDimension::Prescription.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Insurer-side billing state. Absence of a value is modeled as `None`
/// wherever this enum appears.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceBillingStatus {
    ReadyToSend,
    ForFixing,
    Sent,
    Paid,
}

impl InsuranceBillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceBillingStatus::ReadyToSend => "ready_to_send",
            InsuranceBillingStatus::ForFixing => "for_fixing",
            InsuranceBillingStatus::Sent => "sent",
            InsuranceBillingStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InsuranceBillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsuranceBillingStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ready_to_send" => Ok(InsuranceBillingStatus::ReadyToSend),
            "for_fixing" => Ok(InsuranceBillingStatus::ForFixing),
            "sent" => Ok(InsuranceBillingStatus::Sent),
            "paid" => Ok(InsuranceBillingStatus::Paid),
            other => Err(EngineError::UnknownStatus {
                dimension: StatusDimension::InsuranceBilling.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Patient-side copayment billing state. Only meaningful for prescriptions
/// whose patient actually owes a copayment; absence is modeled as `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopaymentBillingStatus {
    Paid,
    ForRefund,
}

impl CopaymentBillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopaymentBillingStatus::Paid => "paid",
            CopaymentBillingStatus::ForRefund => "for_refund",
        }
    }
}

impl fmt::Display for CopaymentBillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CopaymentBillingStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "paid" => Ok(CopaymentBillingStatus::Paid),
            "for_refund" => Ok(CopaymentBillingStatus::ForRefund),
            other => Err(EngineError::UnknownStatus {
                dimension: StatusDimension::CopaymentBilling.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Parses an optional status value as presented by the UI menus, where the
/// empty selection clears the dimension.
///
/// Empty or whitespace-only input maps to `None`; anything else must parse
/// as a valid status value.
pub fn parse_optional_status<T: FromStr<Err = EngineError>>(
    s: &str,
) -> Result<Option<T>, EngineError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}
