use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::invoice::{price_line, Invoice, InvoiceDetail, Operator};
use crate::domain::ports::{
    InvoiceDetailRepository, InvoiceRepository, OperatorRepository, ProductRepository,
    SettlementService, SupplierRepository,
};

pub struct InvoiceService<I, O, D, S, P, R> {
    invoices: I,
    operators: O,
    details: D,
    suppliers: S,
    products: P,
    settlements: R,
}

fn require<T>(found: Option<T>, entity: &'static str, id: Uuid) -> Result<T, DomainError> {
    found.ok_or_else(|| {
        warn!("{} {} not found", entity, id);
        DomainError::not_found(entity, id)
    })
}

impl<I, O, D, S, P, R> InvoiceService<I, O, D, S, P, R>
where
    I: InvoiceRepository,
    O: OperatorRepository,
    D: InvoiceDetailRepository,
    S: SupplierRepository,
    P: ProductRepository,
    R: SettlementService,
{
    pub fn new(invoices: I, operators: O, details: D, suppliers: S, products: P, settlements: R) -> Self {
        Self {
            invoices,
            operators,
            details,
            suppliers,
            products,
            settlements,
        }
    }

    pub fn retrieve_all_invoices(&self) -> Result<Vec<Invoice>, DomainError> {
        let invoices = self.invoices.find_all()?;
        debug!("Retrieved {} invoices", invoices.len());
        Ok(invoices)
    }

    /// Persists the invoice exactly as given, timestamps included.
    pub fn add_invoice(&self, invoice: Invoice) -> Result<Invoice, DomainError> {
        let saved = self.invoices.save(&invoice)?;
        info!("Saved invoice {}", saved.id);
        Ok(saved)
    }

    /// Validates, prices and stamps `details` for `invoice_id`. Every line is
    /// checked and every product resolved before anything is written.
    fn price_details(
        &self,
        invoice_id: Uuid,
        details: Vec<InvoiceDetail>,
    ) -> Result<Vec<InvoiceDetail>, DomainError> {
        let mut priced = Vec::with_capacity(details.len());
        for mut detail in details {
            if !(0..=100).contains(&detail.discount_percent) {
                return Err(DomainError::InvalidInput(format!(
                    "discount percent {} is outside 0..=100",
                    detail.discount_percent
                )));
            }
            if detail.quantity < 0 {
                return Err(DomainError::InvalidInput(format!(
                    "quantity {} is negative",
                    detail.quantity
                )));
            }
            let product = require(
                self.products.find_by_id(detail.product_id)?,
                "Product",
                detail.product_id,
            )?;
            let pricing = price_line(&product.unit_price, detail.quantity, detail.discount_percent);
            debug!(
                "Detail {}: gross {} discount {} total {}",
                detail.id, pricing.gross, pricing.discount, pricing.total
            );
            detail.invoice_id = Some(invoice_id);
            detail.discount_amount = pricing.discount;
            detail.line_total = pricing.total;
            priced.push(detail);
        }
        Ok(priced)
    }

    /// Prices and persists `details` against `invoice`, adds them to the
    /// lines it already holds and recomputes its totals over the whole set.
    ///
    /// A missing product or an invalid line leaves the store untouched.
    /// The returned invoice is not saved here.
    pub fn add_invoice_details(
        &self,
        mut invoice: Invoice,
        details: Vec<InvoiceDetail>,
    ) -> Result<Invoice, DomainError> {
        for detail in self.price_details(invoice.id, details)? {
            let saved = self.details.save(&detail)?;
            invoice.details.push(saved);
        }
        invoice.recompute_totals();
        info!(
            "Invoice {} now totals {} ({} discount) over {} details",
            invoice.id,
            invoice.amount,
            invoice.discount_amount,
            invoice.details.len()
        );
        Ok(invoice)
    }

    /// Prices `details` and stores them with the invoice's new totals in a
    /// single store transaction, so the totals never drift from the stored
    /// lines even when the write fails or two appends race.
    pub fn append_invoice_details(
        &self,
        invoice_id: Uuid,
        details: Vec<InvoiceDetail>,
    ) -> Result<Invoice, DomainError> {
        let priced = self.price_details(invoice_id, details)?;
        let invoice = self.invoices.append_details(invoice_id, &priced, Utc::now())?;
        info!(
            "Invoice {} now totals {} ({} discount) over {} details",
            invoice.id,
            invoice.amount,
            invoice.discount_amount,
            invoice.details.len()
        );
        Ok(invoice)
    }

    /// Archives the invoice: a full save followed by the narrower
    /// `mark_updated` write. Invoices are never deleted.
    pub fn cancel_invoice(&self, id: Uuid) -> Result<(), DomainError> {
        let mut invoice = require(self.invoices.find_by_id(id)?, "Invoice", id)?;
        invoice.archived = true;
        self.invoices.save(&invoice)?;
        self.invoices.mark_updated(id)?;
        info!("Cancelled invoice {}", id);
        Ok(())
    }

    pub fn retrieve_invoice(&self, id: Uuid) -> Result<Invoice, DomainError> {
        require(self.invoices.find_by_id(id)?, "Invoice", id)
    }

    pub fn invoices_by_supplier(&self, supplier_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        let supplier = require(self.suppliers.find_by_id(supplier_id)?, "Supplier", supplier_id)?;
        debug!(
            "Supplier {} holds {} invoices",
            supplier_id,
            supplier.invoices.len()
        );
        Ok(supplier.invoices)
    }

    /// Records the invoice on the operator side only; re-assigning the same
    /// invoice is a no-op apart from the save.
    pub fn assign_operator_to_invoice(
        &self,
        operator_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Operator, DomainError> {
        let mut operator = require(self.operators.find_by_id(operator_id)?, "Operator", operator_id)?;
        let invoice = require(self.invoices.find_by_id(invoice_id)?, "Invoice", invoice_id)?;
        operator.invoices.insert(invoice.id);
        let saved = self.operators.save(&operator)?;
        info!("Assigned invoice {} to operator {}", invoice_id, operator_id);
        Ok(saved)
    }

    /// Settled revenue as a percentage of the amount invoiced over
    /// `[start, end]`. Nothing invoiced yields zero.
    pub fn recovery_rate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BigDecimal, DomainError> {
        if start > end {
            return Err(DomainError::InvalidInput(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        let invoiced = self.invoices.total_amount_between(start, end)?;
        let settled = self.settlements.revenue_between(start, end)?;
        if invoiced.is_zero() {
            debug!("Nothing invoiced between {} and {}", start, end);
            return Ok(BigDecimal::zero());
        }
        Ok((settled * BigDecimal::from(100)) / invoiced)
    }
}
