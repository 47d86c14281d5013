//! # Praxis Core
//!
//! Core business logic for the practice administration backend: the
//! prescription (VO) lifecycle and copayment settlement engine.
//!
//! This crate contains pure domain operations and in-memory session state:
//! - Base prescription records loaded from a JSON dataset (or demo data)
//! - The status override store and the cross-field transition rules
//! - The statutory copayment calculator
//! - Copayment invoice / refund correction letter composition
//!
//! **No API concerns**: HTTP servers, OpenAPI documentation and CLI parsing
//! belong in `api-rest`, `api-shared` and `cli`.

pub mod config;
pub mod copayment;
pub mod directory;
pub mod error;
pub mod records;
pub mod rules;
pub mod service;
pub mod settlement;
pub mod status;
pub mod store;

pub use config::{
    dataset_path_from_env_value, practice_name_from_env_value, CoreConfig, DEFAULT_PRACTICE_NAME,
};
pub use directory::PrescriptionDirectory;
pub use error::{CalculatorAnomaly, EngineError, EngineResult};
pub use records::{CopaymentInfo, CopaymentProfile, Prescription, RefundRecord};
pub use rules::{plan_prescription_transition, DerivedChange, TransitionPlan, TransitionRuleEngine};
pub use service::{EffectiveCopaymentStatus, PracticeService, PrescriptionOverview};
pub use settlement::{
    CopaymentInvoice, RefundLetter, SettlementComposer, SettlementStage, SettlementView,
};
pub use status::{
    parse_optional_status, CopaymentBillingStatus, InsuranceBillingStatus, PrescriptionStatus,
    StatusDimension,
};
pub use store::StatusStore;
pub use vo_types::{IdentifierError, InvoiceNumber, PrescriptionNumber};
