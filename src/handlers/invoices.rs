use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::invoice::{Invoice, InvoiceDetail, Operator};
use crate::errors::AppError;
use crate::AppInvoiceService;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    /// Decimal amount as a string, e.g. "1000.00". Defaults to zero.
    pub amount: Option<String>,
    /// Decimal discount as a string. Defaults to zero.
    pub discount_amount: Option<String>,
    /// Defaults to the time the request is handled.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateInvoiceResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvoiceDetailRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Whole-number percent, 0 to 100.
    #[serde(default)]
    pub discount_percent: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddDetailsRequest {
    pub details: Vec<InvoiceDetailRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceDetailResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub discount_percent: i32,
    pub discount_amount: String,
    pub line_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub amount: String,
    pub discount_amount: String,
    pub created_at: String,
    pub updated_at: String,
    pub archived: bool,
    pub operator_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub details: Vec<InvoiceDetailResponse>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            amount: invoice.amount.to_string(),
            discount_amount: invoice.discount_amount.to_string(),
            created_at: invoice.created_at.to_rfc3339(),
            updated_at: invoice.updated_at.to_rfc3339(),
            archived: invoice.archived,
            operator_id: invoice.operator_id,
            supplier_id: invoice.supplier_id,
            details: invoice
                .details
                .into_iter()
                .map(|d| InvoiceDetailResponse {
                    id: d.id,
                    product_id: d.product_id,
                    quantity: d.quantity,
                    discount_percent: d.discount_percent,
                    discount_amount: d.discount_amount.to_string(),
                    line_total: d.line_total.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OperatorResponse {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub invoices: Vec<Uuid>,
}

impl From<Operator> for OperatorResponse {
    fn from(operator: Operator) -> Self {
        Self {
            id: operator.id,
            last_name: operator.last_name,
            first_name: operator.first_name,
            invoices: operator.invoices.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecoveryRateParams {
    /// Inclusive lower bound, RFC 3339.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound, RFC 3339.
    pub end: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecoveryRateResponse {
    pub start: String,
    pub end: String,
    /// Percentage rounded to two decimals, e.g. "50.00".
    pub rate: String,
}

fn parse_amount(field: &str, value: Option<&str>) -> Result<BigDecimal, AppError> {
    let Some(value) = value else {
        return Ok(BigDecimal::from(0));
    };
    let amount = BigDecimal::from_str(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid {} '{}': {}", field, value, e)))?;
    if amount < BigDecimal::from(0) {
        return Err(AppError::BadRequest(format!("{} must not be negative", field)));
    }
    Ok(amount)
}

fn blocking_failed(e: actix_web::error::BlockingError) -> AppError {
    AppError::Internal(e.to_string())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /invoices
///
/// Returns every invoice, archived ones included.
#[utoipa::path(
    get,
    path = "/invoices",
    responses(
        (status = 200, description = "All invoices", body = [InvoiceResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    service: web::Data<AppInvoiceService>,
) -> Result<HttpResponse, AppError> {
    let invoices = web::block(move || service.retrieve_all_invoices())
        .await
        .map_err(blocking_failed)??;

    let body: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /invoices/{id}
#[utoipa::path(
    get,
    path = "/invoices/{id}",
    params(
        ("id" = Uuid, Path, description = "Invoice UUID"),
    ),
    responses(
        (status = 200, description = "Invoice found", body = InvoiceResponse),
        (status = 404, description = "Invoice not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    service: web::Data<AppInvoiceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let invoice = web::block(move || service.retrieve_invoice(id))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(InvoiceResponse::from(invoice)))
}

/// POST /invoices
///
/// Stores a new invoice with the given totals and timestamps. Details are
/// attached separately through `POST /invoices/{id}/details`.
#[utoipa::path(
    post,
    path = "/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = CreateInvoiceResponse),
        (status = 400, description = "Malformed amount"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    service: web::Data<AppInvoiceService>,
    body: web::Json<CreateInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let now = Utc::now();
    let mut invoice = Invoice::new(body.created_at.unwrap_or(now));
    invoice.updated_at = body.updated_at.unwrap_or(invoice.created_at);
    invoice.amount = parse_amount("amount", body.amount.as_deref())?;
    invoice.discount_amount = parse_amount("discount_amount", body.discount_amount.as_deref())?;
    invoice.archived = body.archived;
    invoice.supplier_id = body.supplier_id;

    let saved = web::block(move || service.add_invoice(invoice))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Created().json(CreateInvoiceResponse { id: saved.id }))
}

/// POST /invoices/{id}/details
///
/// Prices the submitted lines and adds them to the invoice. The lines and the
/// recomputed totals are stored together or not at all.
#[utoipa::path(
    post,
    path = "/invoices/{id}/details",
    params(
        ("id" = Uuid, Path, description = "Invoice UUID"),
    ),
    request_body = AddDetailsRequest,
    responses(
        (status = 200, description = "Invoice with its new details", body = InvoiceResponse),
        (status = 400, description = "Invalid quantity or discount"),
        (status = 404, description = "Invoice or product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn add_invoice_details(
    service: web::Data<AppInvoiceService>,
    path: web::Path<Uuid>,
    body: web::Json<AddDetailsRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let details: Vec<InvoiceDetail> = body
        .into_inner()
        .details
        .into_iter()
        .map(|d| InvoiceDetail::new(d.product_id, d.quantity, d.discount_percent))
        .collect();

    let invoice = web::block(move || service.append_invoice_details(id, details))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(InvoiceResponse::from(invoice)))
}

/// PUT /invoices/{id}/cancel
///
/// Archives the invoice. Cancelled invoices stay readable.
#[utoipa::path(
    put,
    path = "/invoices/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Invoice UUID"),
    ),
    responses(
        (status = 204, description = "Invoice archived"),
        (status = 404, description = "Invoice not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn cancel_invoice(
    service: web::Data<AppInvoiceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    web::block(move || service.cancel_invoice(id))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /suppliers/{id}/invoices
#[utoipa::path(
    get,
    path = "/suppliers/{id}/invoices",
    params(
        ("id" = Uuid, Path, description = "Supplier UUID"),
    ),
    responses(
        (status = 200, description = "Invoices of the supplier", body = [InvoiceResponse]),
        (status = 404, description = "Supplier not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn list_supplier_invoices(
    service: web::Data<AppInvoiceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let supplier_id = path.into_inner();

    let invoices = web::block(move || service.invoices_by_supplier(supplier_id))
        .await
        .map_err(blocking_failed)??;

    let body: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// PUT /operators/{operator_id}/invoices/{invoice_id}
#[utoipa::path(
    put,
    path = "/operators/{operator_id}/invoices/{invoice_id}",
    params(
        ("operator_id" = Uuid, Path, description = "Operator UUID"),
        ("invoice_id" = Uuid, Path, description = "Invoice UUID"),
    ),
    responses(
        (status = 200, description = "Operator with its invoices", body = OperatorResponse),
        (status = 404, description = "Operator or invoice not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn assign_operator(
    service: web::Data<AppInvoiceService>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (operator_id, invoice_id) = path.into_inner();

    let operator = web::block(move || service.assign_operator_to_invoice(operator_id, invoice_id))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(OperatorResponse::from(operator)))
}

/// GET /invoices/recovery-rate
///
/// Settled revenue as a percentage of the amount invoiced between `start`
/// and `end`. A period with nothing invoiced reports "0.00".
#[utoipa::path(
    get,
    path = "/invoices/recovery-rate",
    params(RecoveryRateParams),
    responses(
        (status = 200, description = "Recovery rate", body = RecoveryRateResponse),
        (status = 400, description = "start is after end"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "invoices"
)]
pub async fn recovery_rate(
    service: web::Data<AppInvoiceService>,
    query: web::Query<RecoveryRateParams>,
) -> Result<HttpResponse, AppError> {
    let RecoveryRateParams { start, end } = query.into_inner();

    let rate = web::block(move || service.recovery_rate(start, end))
        .await
        .map_err(blocking_failed)??;

    Ok(HttpResponse::Ok().json(RecoveryRateResponse {
        start: start.to_rfc3339(),
        end: end.to_rfc3339(),
        rate: rate.with_scale_round(2, bigdecimal::RoundingMode::HalfUp).to_string(),
    }))
}
