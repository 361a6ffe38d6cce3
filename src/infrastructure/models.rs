use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::invoice::{Invoice, InvoiceDetail, Product};
use crate::schema::{
    invoice_details, invoices, operator_invoices, operators, products, settlements, suppliers,
};

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Insertable,
)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceRow {
    pub id: Uuid,
    pub amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived: bool,
    pub supplier_id: Option<Uuid>,
}

impl From<&Invoice> for InvoiceRow {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            amount: invoice.amount.clone(),
            discount_amount: invoice.discount_amount.clone(),
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
            archived: invoice.archived,
            supplier_id: invoice.supplier_id,
        }
    }
}

impl InvoiceRow {
    pub fn into_domain(self, details: Vec<InvoiceDetail>, operator_id: Option<Uuid>) -> Invoice {
        Invoice {
            id: self.id,
            amount: self.amount,
            discount_amount: self.discount_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
            archived: self.archived,
            operator_id,
            supplier_id: self.supplier_id,
            details,
        }
    }
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = invoice_details)]
#[diesel(belongs_to(InvoiceRow, foreign_key = invoice_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceDetailRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub discount_percent: i32,
    pub discount_amount: BigDecimal,
    pub line_total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl From<InvoiceDetailRow> for InvoiceDetail {
    fn from(row: InvoiceDetailRow) -> Self {
        Self {
            id: row.id,
            invoice_id: Some(row.invoice_id),
            product_id: row.product_id,
            quantity: row.quantity,
            discount_percent: row.discount_percent,
            discount_amount: row.discount_amount,
            line_total: row.line_total,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoice_details)]
pub struct NewInvoiceDetailRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub discount_percent: i32,
    pub discount_amount: BigDecimal,
    pub line_total: BigDecimal,
}

impl NewInvoiceDetailRow {
    pub fn attached(detail: &InvoiceDetail, invoice_id: Uuid) -> Self {
        Self {
            id: detail.id,
            invoice_id,
            product_id: detail.product_id,
            quantity: detail.quantity,
            discount_percent: detail.discount_percent,
            discount_amount: detail.discount_amount.clone(),
            line_total: detail.line_total.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub label: String,
    pub unit_price: BigDecimal,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            label: row.label,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = suppliers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SupplierRow {
    pub id: Uuid,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = operators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OperatorRow {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = operator_invoices)]
pub struct OperatorInvoiceRow {
    pub invoice_id: Uuid,
    pub operator_id: Uuid,
}

/// Settlements are recorded by the payments side; this crate only sums them,
/// so the row type exists for seeding the table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = settlements)]
pub struct SettlementRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount_paid: BigDecimal,
    pub amount_remaining: BigDecimal,
    pub paid: bool,
    pub settled_at: DateTime<Utc>,
}
