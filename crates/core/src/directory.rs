//! Base prescription record source.
//!
//! Loads the immutable prescription records the rest of the engine works on,
//! either from a JSON dataset file or from the built-in demo dataset. The
//! wire format is strict (`deny_unknown_fields`); a record that fails to
//! parse or validate is logged and skipped rather than taking the whole
//! dataset down.
//!
//! Records are immutable after load: the status store and the settlement
//! composer layer their session state on top, keyed by prescription number.

use crate::error::{EngineError, EngineResult};
use crate::records::{CopaymentInfo, CopaymentProfile, Prescription, RefundRecord};
use crate::status::{CopaymentBillingStatus, InsuranceBillingStatus, PrescriptionStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use vo_types::{InvoiceNumber, PrescriptionNumber};

/// Demo dataset the prototype falls back to when no dataset file is
/// configured. Goes through the same strict wire parsing as a real file.
const DEMO_DATASET: &str = include_str!("demo_prescriptions.json");

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrescriptionWire {
    number: String,
    patient_name: String,
    treatment_label: String,
    prescribed_treatments: u32,
    completed_treatments: u32,
    amount_per_treatment: Decimal,
    status: PrescriptionStatus,
    #[serde(default)]
    insurance_billing_status: Option<InsuranceBillingStatus>,
    copayment: CopaymentWire,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CopaymentWire {
    exempt: bool,
    #[serde(default)]
    billing_status: Option<CopaymentBillingStatus>,
    #[serde(default)]
    info: Option<CopaymentInfoWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CopaymentInfoWire {
    invoice_number: String,
    issued_on: NaiveDate,
    amount: Decimal,
    #[serde(default)]
    refund: Option<RefundWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RefundWire {
    invoice_number: String,
    issued_on: NaiveDate,
    amount: Decimal,
    actual_copayment: Decimal,
}

// ============================================================================
// Wire → domain conversion (internal)
// ============================================================================

fn wire_to_domain(wire: PrescriptionWire) -> EngineResult<Prescription> {
    let number = PrescriptionNumber::new(&wire.number)?;

    if wire.amount_per_treatment.is_sign_negative() {
        return Err(EngineError::InvalidInput(format!(
            "amount_per_treatment must not be negative (prescription {number})"
        )));
    }
    if wire.patient_name.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "patient_name cannot be empty (prescription {number})"
        )));
    }
    if wire.completed_treatments > wire.prescribed_treatments {
        // Accepted, but the refund path will surface it as an anomaly.
        tracing::warn!(
            prescription = %number,
            completed = wire.completed_treatments,
            prescribed = wire.prescribed_treatments,
            "completed treatment count exceeds prescribed count"
        );
    }

    let copayment = if wire.copayment.exempt {
        if wire.copayment.billing_status.is_some() || wire.copayment.info.is_some() {
            return Err(EngineError::InvalidInput(format!(
                "exempt prescription {number} must not carry copayment billing data"
            )));
        }
        CopaymentProfile::Exempt
    } else {
        CopaymentProfile::Billable {
            billing_status: wire.copayment.billing_status,
            info: wire.copayment.info.map(info_to_domain).transpose()?,
        }
    };

    Ok(Prescription {
        number,
        patient_name: wire.patient_name.trim().to_owned(),
        treatment_label: wire.treatment_label.trim().to_owned(),
        prescribed_treatments: wire.prescribed_treatments,
        completed_treatments: wire.completed_treatments,
        amount_per_treatment: wire.amount_per_treatment,
        status: wire.status,
        insurance_billing_status: wire.insurance_billing_status,
        copayment,
    })
}

fn info_to_domain(wire: CopaymentInfoWire) -> EngineResult<CopaymentInfo> {
    Ok(CopaymentInfo {
        invoice_number: InvoiceNumber::new(&wire.invoice_number)?,
        issued_on: wire.issued_on,
        amount: wire.amount,
        refund: wire
            .refund
            .map(|refund| {
                Ok::<_, EngineError>(RefundRecord {
                    invoice_number: InvoiceNumber::new(&refund.invoice_number)?,
                    issued_on: refund.issued_on,
                    amount: refund.amount,
                    actual_copayment: refund.actual_copayment,
                })
            })
            .transpose()?,
    })
}

// ============================================================================
// Public directory
// ============================================================================

/// Immutable, indexed collection of the loaded base records.
#[derive(Debug)]
pub struct PrescriptionDirectory {
    records: Vec<Prescription>,
    index: HashMap<PrescriptionNumber, usize>,
}

impl PrescriptionDirectory {
    /// Builds a directory from already-validated domain records. Later
    /// duplicates of a prescription number are logged and skipped.
    pub fn from_records(records: Vec<Prescription>) -> Self {
        let mut deduped: Vec<Prescription> = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.number) {
                tracing::warn!(prescription = %record.number, "duplicate prescription number; keeping the first record");
                continue;
            }
            index.insert(record.number.clone(), deduped.len());
            deduped.push(record);
        }

        Self {
            records: deduped,
            index,
        }
    }

    /// Loads all prescriptions from a JSON dataset file.
    ///
    /// The file must contain a JSON array. Individual records that fail
    /// strict parsing or validation are logged as warnings and skipped, the
    /// same way the record source would skip an unreadable row.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatasetRead`] if the file cannot be read and
    /// [`EngineError::DatasetDeserialization`] if it is not a JSON array.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(EngineError::DatasetRead)?;
        Self::from_json(&contents)
    }

    /// The built-in demo dataset the prototype falls back to when no dataset
    /// file is configured.
    pub fn demo() -> EngineResult<Self> {
        Self::from_json(DEMO_DATASET)
    }

    fn from_json(contents: &str) -> EngineResult<Self> {
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(contents).map_err(EngineError::DatasetDeserialization)?;

        let mut records = Vec::with_capacity(raw.len());
        for (position, value) in raw.into_iter().enumerate() {
            let wire: PrescriptionWire = match serde_json::from_value(value) {
                Ok(wire) => wire,
                Err(err) => {
                    tracing::warn!(position, error = %err, "skipping malformed prescription record");
                    continue;
                }
            };
            match wire_to_domain(wire) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(position, error = %err, "skipping invalid prescription record");
                }
            }
        }

        Ok(Self::from_records(records))
    }

    /// All loaded prescriptions, in dataset order.
    pub fn all(&self) -> &[Prescription] {
        &self.records
    }

    /// Looks up a prescription by number.
    pub fn get(&self, number: &PrescriptionNumber) -> Option<&Prescription> {
        self.index.get(number).map(|&i| &self.records[i])
    }

    /// Looks up a prescription by number, erroring for unknown numbers.
    pub fn require(&self, number: &PrescriptionNumber) -> EngineResult<&Prescription> {
        self.get(number)
            .ok_or_else(|| EngineError::UnknownPrescription(number.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn demo_dataset_loads_and_indexes() {
        let directory = PrescriptionDirectory::demo().expect("demo dataset parses");
        assert_eq!(directory.len(), 6);

        let number = PrescriptionNumber::new("VO-2024-0117").expect("valid number");
        let record = directory.get(&number).expect("demo record present");
        assert_eq!(record.patient_name, "Lena Hartmann");
        assert!(record.course_interrupted());
    }

    #[test]
    fn loads_valid_records_from_a_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"[
                {{
                    "number": "VO-1",
                    "patient_name": "Jo Miller",
                    "treatment_label": "Manual therapy",
                    "prescribed_treatments": 8,
                    "completed_treatments": 3,
                    "amount_per_treatment": "25.00",
                    "status": "active",
                    "copayment": {{ "exempt": false }}
                }}
            ]"#
        )
        .expect("write dataset");

        let directory = PrescriptionDirectory::from_file(file.path()).expect("load dataset");
        assert_eq!(directory.len(), 1);
        let record = &directory.all()[0];
        assert_eq!(record.prescribed_treatments, 8);
        assert_eq!(
            record.copayment,
            CopaymentProfile::Billable {
                billing_status: None,
                info: None,
            }
        );
    }

    #[test]
    fn skips_records_with_unknown_keys_or_bad_values() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"[
                {{
                    "number": "VO-1",
                    "patient_name": "Jo Miller",
                    "treatment_label": "Manual therapy",
                    "prescribed_treatments": 8,
                    "completed_treatments": 3,
                    "amount_per_treatment": "25.00",
                    "status": "active",
                    "copayment": {{ "exempt": false }},
                    "unexpected_key": true
                }},
                {{
                    "number": "VO-2",
                    "patient_name": "Sam Krause",
                    "treatment_label": "Manual therapy",
                    "prescribed_treatments": 8,
                    "completed_treatments": 3,
                    "amount_per_treatment": "25.00",
                    "status": "not_a_status",
                    "copayment": {{ "exempt": false }}
                }},
                {{
                    "number": "VO-3",
                    "patient_name": "Ada Lorenz",
                    "treatment_label": "Manual therapy",
                    "prescribed_treatments": 6,
                    "completed_treatments": 6,
                    "amount_per_treatment": "20.00",
                    "status": "treatment_complete",
                    "copayment": {{ "exempt": true }}
                }}
            ]"#
        )
        .expect("write dataset");

        let directory = PrescriptionDirectory::from_file(file.path()).expect("load dataset");
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.all()[0].patient_name, "Ada Lorenz");
    }

    #[test]
    fn rejects_exempt_records_that_carry_copayment_data() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            file,
            r#"[
                {{
                    "number": "VO-1",
                    "patient_name": "Jo Miller",
                    "treatment_label": "Manual therapy",
                    "prescribed_treatments": 8,
                    "completed_treatments": 3,
                    "amount_per_treatment": "25.00",
                    "status": "active",
                    "copayment": {{ "exempt": true, "billing_status": "paid" }}
                }}
            ]"#
        )
        .expect("write dataset");

        let directory = PrescriptionDirectory::from_file(file.path()).expect("load dataset");
        assert!(directory.is_empty());
    }

    #[test]
    fn non_array_dataset_is_a_hard_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(file, "{{}}").expect("write dataset");

        let err = PrescriptionDirectory::from_file(file.path())
            .expect_err("object instead of array must fail");
        assert!(matches!(err, EngineError::DatasetDeserialization(_)));
    }
}
