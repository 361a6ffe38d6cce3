pub mod invoices;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        invoices::list_invoices,
        invoices::get_invoice,
        invoices::create_invoice,
        invoices::add_invoice_details,
        invoices::cancel_invoice,
        invoices::list_supplier_invoices,
        invoices::assign_operator,
        invoices::recovery_rate,
    ),
    components(schemas(
        invoices::CreateInvoiceRequest,
        invoices::CreateInvoiceResponse,
        invoices::InvoiceDetailRequest,
        invoices::AddDetailsRequest,
        invoices::InvoiceDetailResponse,
        invoices::InvoiceResponse,
        invoices::OperatorResponse,
        invoices::RecoveryRateResponse,
    )),
    tags((name = "invoices", description = "Invoices, their details and recovery statistics"))
)]
pub struct ApiDoc;
