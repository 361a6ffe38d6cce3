use std::collections::BTreeSet;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: Uuid,
    /// Net invoiced amount, discounts already deducted.
    pub amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived: bool,
    /// Read from the operator side of the assignment; saving an invoice
    /// never writes it.
    pub operator_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub details: Vec<InvoiceDetail>,
}

impl Invoice {
    /// A fresh, empty, non-archived invoice with both timestamps set to `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount: BigDecimal::zero(),
            discount_amount: BigDecimal::zero(),
            created_at: at,
            updated_at: at,
            archived: false,
            operator_id: None,
            supplier_id: None,
            details: vec![],
        }
    }

    /// Sets both totals to the sums over the current `details`.
    pub fn recompute_totals(&mut self) {
        let mut amount = BigDecimal::zero();
        let mut discount_amount = BigDecimal::zero();
        for detail in &self.details {
            amount += detail.line_total.clone();
            discount_amount += detail.discount_amount.clone();
        }
        self.amount = amount;
        self.discount_amount = discount_amount;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDetail {
    pub id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Whole-number percent: 10 means 10 %.
    pub discount_percent: i32,
    pub discount_amount: BigDecimal,
    pub line_total: BigDecimal,
}

impl InvoiceDetail {
    pub fn new(product_id: Uuid, quantity: i32, discount_percent: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_id: None,
            product_id,
            quantity,
            discount_percent,
            discount_amount: BigDecimal::zero(),
            line_total: BigDecimal::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub label: String,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Supplier {
    pub id: Uuid,
    pub label: String,
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub invoices: BTreeSet<Uuid>,
}

impl Operator {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            last_name: last_name.into(),
            first_name: first_name.into(),
            invoices: BTreeSet::new(),
        }
    }
}

/// Amounts owed for a single invoice line.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePricing {
    pub gross: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

/// Prices one line: `gross = unit_price × quantity`, the discount is
/// `discount_percent` percent of the gross, and the total is what remains.
pub fn price_line(unit_price: &BigDecimal, quantity: i32, discount_percent: i32) -> LinePricing {
    let gross = unit_price * &BigDecimal::from(quantity);
    let discount = (&gross * &BigDecimal::from(discount_percent)) / BigDecimal::from(100);
    let total = &gross - &discount;
    LinePricing {
        gross,
        discount,
        total,
    }
}
