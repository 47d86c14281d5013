//! # API REST
//!
//! REST API implementation for the praxis admin backend.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status mapping)
//!
//! Uses `api-shared` for the wire types. The router is built here exactly
//! once and mounted by the `praxis-run` binary, so there is a single copy of
//! every handler and conversion.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    dto, HealthService,
};
use praxis_core::{
    parse_optional_status, CopaymentInvoice, DerivedChange, EffectiveCopaymentStatus, EngineError,
    PracticeService, PrescriptionNumber, PrescriptionOverview, RefundLetter, SettlementView,
    TransitionPlan,
};
use rust_decimal::Decimal;

/// Application state for the REST API.
///
/// Contains shared state that needs to be accessible to all request
/// handlers: the `PracticeService` facade over the settlement engine.
#[derive(Clone)]
pub struct AppState {
    service: Arc<PracticeService>,
}

impl AppState {
    pub fn new(service: Arc<PracticeService>) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_prescriptions,
        change_prescription_status,
        change_insurance_status,
        change_copayment_status,
        mark_aborted,
        generate_invoice,
        generate_refund,
        settlement_view,
        invoice_view,
    ),
    components(schemas(
        dto::HealthRes,
        dto::PrescriptionSummary,
        dto::ListPrescriptionsRes,
        dto::ChangePrescriptionStatusReq,
        dto::ChangePrescriptionStatusRes,
        dto::DerivedChangeDto,
        dto::ChangeBillingStatusReq,
        dto::ChangeBillingStatusRes,
        dto::MarkAbortedReq,
        dto::CopaymentInvoiceRes,
        dto::RefundLetterRes,
        dto::SettlementViewRes,
    ))
)]
struct ApiDoc;

/// Builds the REST router with all routes, Swagger UI and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prescriptions", get(list_prescriptions))
        .route(
            "/prescriptions/:number/status",
            put(change_prescription_status),
        )
        .route(
            "/prescriptions/:number/insurance-status",
            put(change_insurance_status),
        )
        .route(
            "/prescriptions/:number/copayment-status",
            put(change_copayment_status),
        )
        .route("/prescriptions/:number/abort", post(mark_aborted))
        .route(
            "/prescriptions/:number/copayment-invoice",
            post(generate_invoice),
        )
        .route("/prescriptions/:number/refund", post(generate_refund))
        .route("/prescriptions/:number/settlement", get(settlement_view))
        .route(
            "/prescriptions/:number/settlement/invoice",
            get(invoice_view),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Error mapping and conversions (internal)
// ============================================================================

type HandlerError = (StatusCode, &'static str);

fn engine_error(context: &'static str, err: EngineError) -> HandlerError {
    let mapped = match &err {
        EngineError::UnknownPrescription(_) => (StatusCode::NOT_FOUND, "Unknown prescription"),
        EngineError::UnknownStatus { .. } => (StatusCode::BAD_REQUEST, "Unknown status value"),
        EngineError::InvalidIdentifier(_) => {
            (StatusCode::BAD_REQUEST, "Invalid prescription number")
        }
        EngineError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
        EngineError::CopaymentNotApplicable => (
            StatusCode::CONFLICT,
            "Patient is exempt from copayment",
        ),
        EngineError::RefundNotEligible => (
            StatusCode::CONFLICT,
            "Refund is not generatable in the current state",
        ),
        EngineError::NoDocument => (
            StatusCode::NOT_FOUND,
            "No copayment document generated yet",
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    };

    if mapped.0 == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{context} error: {err:?}");
    } else {
        tracing::debug!("{context} refused: {err:?}");
    }
    mapped
}

fn parse_number(raw: &str) -> Result<PrescriptionNumber, HandlerError> {
    PrescriptionNumber::new(raw)
        .map_err(|err| engine_error("parse prescription number", err.into()))
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", praxis_core::copayment::round_currency(amount))
}

fn summary_res(row: &PrescriptionOverview) -> dto::PrescriptionSummary {
    dto::PrescriptionSummary {
        number: row.number.to_string(),
        patient_name: row.patient_name.clone(),
        treatment_label: row.treatment_label.clone(),
        completed_treatments: row.completed_treatments,
        prescribed_treatments: row.prescribed_treatments,
        amount_per_treatment: money(row.amount_per_treatment),
        status: row.status.to_string(),
        insurance_billing_status: row.insurance_billing_status.map(|s| s.to_string()),
        copayment_billing_status: match row.copayment_billing {
            EffectiveCopaymentStatus::NotApplicable => "not_applicable".into(),
            EffectiveCopaymentStatus::Unset => "none".into(),
            EffectiveCopaymentStatus::Status(status) => status.to_string(),
        },
        refund_available: row.refund_available,
    }
}

fn derived_changes_res(plan: &TransitionPlan) -> Vec<dto::DerivedChangeDto> {
    plan.derived
        .iter()
        .map(|change| match change {
            DerivedChange::InsuranceBilling(value) => dto::DerivedChangeDto {
                dimension: "insurance_billing".into(),
                status: value.map(|s| s.to_string()),
            },
            DerivedChange::CopaymentBilling(value) => dto::DerivedChangeDto {
                dimension: "copayment_billing".into(),
                status: value.map(|s| s.to_string()),
            },
        })
        .collect()
}

fn invoice_res(view: &CopaymentInvoice) -> dto::CopaymentInvoiceRes {
    dto::CopaymentInvoiceRes {
        practice_name: view.practice_name.clone(),
        prescription_number: view.prescription_number.to_string(),
        patient_name: view.patient_name.clone(),
        treatment_label: view.treatment_label.clone(),
        invoice_number: view.invoice_number.to_string(),
        issued_on: view.issued_on.to_string(),
        treatments_billed: view.treatments_billed,
        amount_per_treatment: money(view.amount_per_treatment),
        treatment_cost: money(view.treatment_cost),
        base_fee: money(view.base_fee),
        cost_share: money(view.cost_share),
        copayment_total: money(view.copayment_total),
    }
}

fn refund_res(view: &RefundLetter) -> dto::RefundLetterRes {
    dto::RefundLetterRes {
        practice_name: view.practice_name.clone(),
        prescription_number: view.prescription_number.to_string(),
        patient_name: view.patient_name.clone(),
        treatment_label: view.treatment_label.clone(),
        refund_invoice_number: view.refund_invoice_number.to_string(),
        original_invoice_number: view.original_invoice_number.to_string(),
        issued_on: view.issued_on.to_string(),
        prescribed_treatments: view.prescribed_treatments,
        completed_treatments: view.completed_treatments,
        original_copayment: money(view.original_copayment),
        actual_copayment: money(view.actual_copayment),
        refund_amount: money(view.refund_amount),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = dto::HealthRes)
    )
)]
/// Health check endpoint for the REST API.
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<dto::HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/prescriptions",
    responses(
        (status = 200, description = "Dashboard rows with effective statuses", body = dto::ListPrescriptionsRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List all prescriptions with their current (override-aware) statuses.
#[axum::debug_handler]
async fn list_prescriptions(
    State(state): State<AppState>,
) -> Result<Json<dto::ListPrescriptionsRes>, HandlerError> {
    let rows = state
        .service
        .overview()
        .map_err(|e| engine_error("list prescriptions", e))?;
    Ok(Json(dto::ListPrescriptionsRes {
        prescriptions: rows.iter().map(summary_res).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/prescriptions/{number}/status",
    request_body = dto::ChangePrescriptionStatusReq,
    responses(
        (status = 200, description = "Status changed; derived writes listed", body = dto::ChangePrescriptionStatusRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Unknown prescription")
    )
)]
/// Change the prescription status.
///
/// Applies the cross-field auto-transitions together with the primary write
/// and reports them back, so the table can update every affected badge.
#[axum::debug_handler]
async fn change_prescription_status(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
    Json(req): Json<dto::ChangePrescriptionStatusReq>,
) -> Result<Json<dto::ChangePrescriptionStatusRes>, HandlerError> {
    let number = parse_number(&number)?;
    let new_status = req
        .status
        .parse()
        .map_err(|e| engine_error("parse prescription status", e))?;

    let plan = state
        .service
        .change_prescription_status(&number, new_status)
        .map_err(|e| engine_error("change prescription status", e))?;

    Ok(Json(dto::ChangePrescriptionStatusRes {
        status: plan.primary.to_string(),
        derived_changes: derived_changes_res(&plan),
    }))
}

#[utoipa::path(
    put,
    path = "/prescriptions/{number}/insurance-status",
    request_body = dto::ChangeBillingStatusReq,
    responses(
        (status = 200, description = "Insurance billing status changed", body = dto::ChangeBillingStatusRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Unknown prescription")
    )
)]
/// Change the insurer-side billing status. An absent or empty value clears
/// the dimension.
#[axum::debug_handler]
async fn change_insurance_status(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
    Json(req): Json<dto::ChangeBillingStatusReq>,
) -> Result<Json<dto::ChangeBillingStatusRes>, HandlerError> {
    let number = parse_number(&number)?;
    let new_status = parse_optional_status(req.status.as_deref().unwrap_or(""))
        .map_err(|e| engine_error("parse insurance billing status", e))?;

    state
        .service
        .change_insurance_billing_status(&number, new_status)
        .map_err(|e| engine_error("change insurance billing status", e))?;

    Ok(Json(dto::ChangeBillingStatusRes { success: true }))
}

#[utoipa::path(
    put,
    path = "/prescriptions/{number}/copayment-status",
    request_body = dto::ChangeBillingStatusReq,
    responses(
        (status = 200, description = "Copayment billing status changed", body = dto::ChangeBillingStatusRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Unknown prescription"),
        (status = 409, description = "Patient is exempt from copayment")
    )
)]
/// Change the patient-side copayment billing status. Refused for exempt
/// patients, whose copayment dimension is not applicable.
#[axum::debug_handler]
async fn change_copayment_status(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
    Json(req): Json<dto::ChangeBillingStatusReq>,
) -> Result<Json<dto::ChangeBillingStatusRes>, HandlerError> {
    let number = parse_number(&number)?;
    let new_status = parse_optional_status(req.status.as_deref().unwrap_or(""))
        .map_err(|e| engine_error("parse copayment billing status", e))?;

    state
        .service
        .change_copayment_billing_status(&number, new_status)
        .map_err(|e| engine_error("change copayment billing status", e))?;

    Ok(Json(dto::ChangeBillingStatusRes { success: true }))
}

#[utoipa::path(
    post,
    path = "/prescriptions/{number}/abort",
    request_body = dto::MarkAbortedReq,
    responses(
        (status = 200, description = "Course aborted; derived writes listed", body = dto::ChangePrescriptionStatusRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Unknown prescription")
    )
)]
/// Abort the treatment course (document-preview collaborator hook).
///
/// Funnels into the same transition rules as a plain status change; the
/// optional follow-up queue update is outside the settlement engine.
#[axum::debug_handler]
async fn mark_aborted(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
    Json(req): Json<dto::MarkAbortedReq>,
) -> Result<Json<dto::ChangePrescriptionStatusRes>, HandlerError> {
    let number = parse_number(&number)?;

    let plan = state
        .service
        .mark_as_aborted(&number, req.update_followup)
        .map_err(|e| engine_error("mark as aborted", e))?;

    Ok(Json(dto::ChangePrescriptionStatusRes {
        status: plan.primary.to_string(),
        derived_changes: derived_changes_res(&plan),
    }))
}

#[utoipa::path(
    post,
    path = "/prescriptions/{number}/copayment-invoice",
    responses(
        (status = 200, description = "Copayment invoice (generated on first call)", body = dto::CopaymentInvoiceRes),
        (status = 404, description = "Unknown prescription"),
        (status = 409, description = "Patient is exempt from copayment")
    )
)]
/// Generate the copayment invoice, creating the copayment document on first
/// call. Repeat calls return the existing document unchanged.
#[axum::debug_handler]
async fn generate_invoice(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
) -> Result<Json<dto::CopaymentInvoiceRes>, HandlerError> {
    let number = parse_number(&number)?;
    let invoice = state
        .service
        .generate_invoice(&number)
        .map_err(|e| engine_error("generate invoice", e))?;
    Ok(Json(invoice_res(&invoice)))
}

#[utoipa::path(
    post,
    path = "/prescriptions/{number}/refund",
    responses(
        (status = 200, description = "Refund correction letter", body = dto::RefundLetterRes),
        (status = 404, description = "Unknown prescription or no document yet"),
        (status = 409, description = "Refund not generatable in the current state")
    )
)]
/// Generate the refund correction letter for an interrupted course.
///
/// Refused once a refund exists; the refund fields are written exactly once.
#[axum::debug_handler]
async fn generate_refund(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
) -> Result<Json<dto::RefundLetterRes>, HandlerError> {
    let number = parse_number(&number)?;
    let letter = state
        .service
        .generate_refund(&number)
        .map_err(|e| engine_error("generate refund", e))?;
    Ok(Json(refund_res(&letter)))
}

#[utoipa::path(
    get,
    path = "/prescriptions/{number}/settlement",
    responses(
        (status = 200, description = "Authoritative settlement view", body = dto::SettlementViewRes),
        (status = 404, description = "Unknown prescription or no document yet"),
        (status = 409, description = "Patient is exempt from copayment")
    )
)]
/// The authoritative settlement view: the refund correction once one exists,
/// else the copayment invoice.
#[axum::debug_handler]
async fn settlement_view(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
) -> Result<Json<dto::SettlementViewRes>, HandlerError> {
    let number = parse_number(&number)?;
    let view = state
        .service
        .settlement_view(&number)
        .map_err(|e| engine_error("settlement view", e))?;

    let res = match view {
        SettlementView::Invoice(invoice) => dto::SettlementViewRes {
            kind: "invoice".into(),
            invoice: Some(invoice_res(&invoice)),
            refund: None,
        },
        SettlementView::Refund(letter) => dto::SettlementViewRes {
            kind: "refund".into(),
            invoice: None,
            refund: Some(refund_res(&letter)),
        },
    };
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/prescriptions/{number}/settlement/invoice",
    responses(
        (status = 200, description = "Original copayment invoice", body = dto::CopaymentInvoiceRes),
        (status = 404, description = "Unknown prescription or no document yet"),
        (status = 409, description = "Patient is exempt from copayment")
    )
)]
/// The original invoice view, reachable for cross-navigation even after a
/// refund has been generated.
#[axum::debug_handler]
async fn invoice_view(
    State(state): State<AppState>,
    AxumPath(number): AxumPath<String>,
) -> Result<Json<dto::CopaymentInvoiceRes>, HandlerError> {
    let number = parse_number(&number)?;
    let invoice = state
        .service
        .invoice_view(&number)
        .map_err(|e| engine_error("invoice view", e))?;
    Ok(Json(invoice_res(&invoice)))
}
