use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::invoice::{Invoice, InvoiceDetail, Operator, Product, Supplier};

pub trait InvoiceRepository: Send + Sync + 'static {
    fn find_all(&self) -> Result<Vec<Invoice>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DomainError>;
    fn save(&self, invoice: &Invoice) -> Result<Invoice, DomainError>;
    /// Stores already-priced `details` against the invoice and rewrites its
    /// totals from the full stored detail set, all in one transaction. The
    /// invoice row stays locked until commit, so concurrent appends to the
    /// same invoice run one after the other.
    fn append_details(
        &self,
        invoice_id: Uuid,
        details: &[InvoiceDetail],
        at: DateTime<Utc>,
    ) -> Result<Invoice, DomainError>;
    /// Narrow write recording that the invoice was archived, touching its
    /// modification timestamp.
    fn mark_updated(&self, id: Uuid) -> Result<(), DomainError>;
    /// Sum of non-archived invoice amounts created within `[start, end]`.
    fn total_amount_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BigDecimal, DomainError>;
}

pub trait OperatorRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Operator>, DomainError>;
    fn save(&self, operator: &Operator) -> Result<Operator, DomainError>;
}

pub trait InvoiceDetailRepository: Send + Sync + 'static {
    fn save(&self, detail: &InvoiceDetail) -> Result<InvoiceDetail, DomainError>;
}

pub trait SupplierRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Supplier>, DomainError>;
}

pub trait ProductRepository: Send + Sync + 'static {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
}

pub trait SettlementService: Send + Sync + 'static {
    /// Total amount paid by settlements dated within `[start, end]`.
    fn revenue_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BigDecimal, DomainError>;
}
