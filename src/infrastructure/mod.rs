pub mod invoice_repo;
pub mod models;
pub mod operator_repo;
pub mod product_repo;
pub mod settlement_service;
pub mod supplier_repo;

#[cfg(test)]
pub(crate) mod test_db;

pub use invoice_repo::{DieselInvoiceDetailRepository, DieselInvoiceRepository};
pub use operator_repo::DieselOperatorRepository;
pub use product_repo::DieselProductRepository;
pub use settlement_service::DieselSettlementService;
pub use supplier_repo::DieselSupplierRepository;

use crate::domain::errors::DomainError;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
