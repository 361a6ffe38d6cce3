use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::invoice::Supplier;
use crate::domain::ports::SupplierRepository;
use crate::schema::{invoices, suppliers};

use super::invoice_repo::hydrate;
use super::models::{InvoiceRow, SupplierRow};

pub struct DieselSupplierRepository {
    pool: DbPool,
}

impl DieselSupplierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SupplierRepository for DieselSupplierRepository {
    /// Loads the supplier together with its invoices in a second query.
    fn find_by_id(&self, id: Uuid) -> Result<Option<Supplier>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = suppliers::table
            .find(id)
            .select(SupplierRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let invoice_rows = invoices::table
            .filter(invoices::supplier_id.eq(row.id))
            .select(InvoiceRow::as_select())
            .order(invoices::created_at.asc())
            .load(&mut conn)?;

        Ok(Some(Supplier {
            id: row.id,
            label: row.label,
            invoices: hydrate(&mut conn, invoice_rows)?,
        }))
    }
}
