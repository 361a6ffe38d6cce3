use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::invoice::{Invoice, InvoiceDetail};
use crate::domain::ports::{InvoiceDetailRepository, InvoiceRepository};
use crate::schema::{invoice_details, invoices, operator_invoices};

use super::models::{InvoiceDetailRow, InvoiceRow, NewInvoiceDetailRow};

/// Attaches details and the assigned operator to a batch of invoice rows,
/// preserving the order of `rows`.
pub(super) fn hydrate(conn: &mut PgConnection, rows: Vec<InvoiceRow>) -> QueryResult<Vec<Invoice>> {
    let details = InvoiceDetailRow::belonging_to(&rows)
        .select(InvoiceDetailRow::as_select())
        .order((invoice_details::created_at.asc(), invoice_details::id.asc()))
        .load(conn)?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let operators: HashMap<Uuid, Uuid> = operator_invoices::table
        .filter(operator_invoices::invoice_id.eq_any(ids))
        .select((operator_invoices::invoice_id, operator_invoices::operator_id))
        .load::<(Uuid, Uuid)>(conn)?
        .into_iter()
        .collect();

    Ok(details
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(lines, row)| {
            let operator_id = operators.get(&row.id).copied();
            row.into_domain(lines.into_iter().map(InvoiceDetail::from).collect(), operator_id)
        })
        .collect())
}

fn hydrate_one(conn: &mut PgConnection, row: InvoiceRow) -> QueryResult<Invoice> {
    let lines = InvoiceDetailRow::belonging_to(&row)
        .select(InvoiceDetailRow::as_select())
        .order((invoice_details::created_at.asc(), invoice_details::id.asc()))
        .load(conn)?;
    let operator_id = operator_invoices::table
        .filter(operator_invoices::invoice_id.eq(row.id))
        .select(operator_invoices::operator_id)
        .first::<Uuid>(conn)
        .optional()?;
    Ok(row.into_domain(lines.into_iter().map(InvoiceDetail::from).collect(), operator_id))
}

// ── Invoices ──────────────────────────────────────────────────────────────────

pub struct DieselInvoiceRepository {
    pool: DbPool,
}

impl DieselInvoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl InvoiceRepository for DieselInvoiceRepository {
    fn find_all(&self) -> Result<Vec<Invoice>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = invoices::table
            .select(InvoiceRow::as_select())
            .order(invoices::created_at.asc())
            .load(&mut conn)?;

        Ok(hydrate(&mut conn, rows)?)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = invoices::table
            .find(id)
            .select(InvoiceRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(hydrate_one(&mut conn, row)?))
    }

    fn save(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::insert_into(invoices::table)
                .values(&InvoiceRow::from(invoice))
                .on_conflict(invoices::id)
                .do_update()
                .set((
                    invoices::amount.eq(excluded(invoices::amount)),
                    invoices::discount_amount.eq(excluded(invoices::discount_amount)),
                    invoices::created_at.eq(excluded(invoices::created_at)),
                    invoices::updated_at.eq(excluded(invoices::updated_at)),
                    invoices::archived.eq(excluded(invoices::archived)),
                    invoices::supplier_id.eq(excluded(invoices::supplier_id)),
                ))
                .returning(InvoiceRow::as_returning())
                .get_result(conn)?;

            Ok(hydrate_one(conn, row)?)
        })
    }

    fn append_details(
        &self,
        invoice_id: Uuid,
        details: &[InvoiceDetail],
        at: DateTime<Utc>,
    ) -> Result<Invoice, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let locked = invoices::table
                .find(invoice_id)
                .select(invoices::id)
                .for_update()
                .get_result::<Uuid>(conn)
                .optional()?;
            if locked.is_none() {
                return Err(DomainError::not_found("Invoice", invoice_id));
            }

            let rows: Vec<NewInvoiceDetailRow> = details
                .iter()
                .map(|d| NewInvoiceDetailRow::attached(d, invoice_id))
                .collect();
            if !rows.is_empty() {
                diesel::insert_into(invoice_details::table)
                    .values(&rows)
                    .execute(conn)?;
            }

            let (amount, discount_amount): (Option<BigDecimal>, Option<BigDecimal>) =
                invoice_details::table
                    .filter(invoice_details::invoice_id.eq(invoice_id))
                    .select((
                        sum(invoice_details::line_total),
                        sum(invoice_details::discount_amount),
                    ))
                    .get_result(conn)?;

            let row = diesel::update(invoices::table.find(invoice_id))
                .set((
                    invoices::amount.eq(amount.unwrap_or_else(BigDecimal::zero)),
                    invoices::discount_amount.eq(discount_amount.unwrap_or_else(BigDecimal::zero)),
                    invoices::updated_at.eq(at),
                ))
                .returning(InvoiceRow::as_returning())
                .get_result(conn)?;

            Ok(hydrate_one(conn, row)?)
        })
    }

    fn mark_updated(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(invoices::table.find(id))
            .set((
                invoices::archived.eq(true),
                invoices::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::not_found("Invoice", id));
        }
        Ok(())
    }

    fn total_amount_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BigDecimal, DomainError> {
        let mut conn = self.pool.get()?;

        let total: Option<BigDecimal> = invoices::table
            .filter(invoices::created_at.between(start, end))
            .filter(invoices::archived.eq(false))
            .select(sum(invoices::amount))
            .get_result(&mut conn)?;

        Ok(total.unwrap_or_else(BigDecimal::zero))
    }
}

// ── Invoice details ───────────────────────────────────────────────────────────

pub struct DieselInvoiceDetailRepository {
    pool: DbPool,
}

impl DieselInvoiceDetailRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl InvoiceDetailRepository for DieselInvoiceDetailRepository {
    fn save(&self, detail: &InvoiceDetail) -> Result<InvoiceDetail, DomainError> {
        let Some(invoice_id) = detail.invoice_id else {
            return Err(DomainError::InvalidInput(format!(
                "detail {} is not attached to an invoice",
                detail.id
            )));
        };
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(invoice_details::table)
            .values(&NewInvoiceDetailRow::attached(detail, invoice_id))
            .on_conflict(invoice_details::id)
            .do_update()
            .set((
                invoice_details::invoice_id.eq(excluded(invoice_details::invoice_id)),
                invoice_details::product_id.eq(excluded(invoice_details::product_id)),
                invoice_details::quantity.eq(excluded(invoice_details::quantity)),
                invoice_details::discount_percent.eq(excluded(invoice_details::discount_percent)),
                invoice_details::discount_amount.eq(excluded(invoice_details::discount_amount)),
                invoice_details::line_total.eq(excluded(invoice_details::line_total)),
            ))
            .returning(InvoiceDetailRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{DieselInvoiceDetailRepository, DieselInvoiceRepository};
    use crate::domain::errors::DomainError;
    use crate::domain::invoice::{Invoice, InvoiceDetail};
    use crate::domain::ports::{InvoiceDetailRepository, InvoiceRepository};
    use crate::infrastructure::test_db::{dec, insert_product, insert_supplier, setup_db};

    fn invoice(amount: &str) -> Invoice {
        let mut invoice = Invoice::new(Utc::now());
        invoice.amount = dec(amount);
        invoice
    }

    #[tokio::test]
    async fn save_and_find_by_id_roundtrip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool.clone());
        let mut invoice = invoice("1000");
        invoice.discount_amount = dec("50");
        invoice.supplier_id = Some(insert_supplier(&pool));

        repo.save(&invoice).expect("save failed");
        let found = repo
            .find_by_id(invoice.id)
            .expect("find failed")
            .expect("invoice should exist");

        assert_eq!(found.id, invoice.id);
        assert_eq!(found.amount, dec("1000"));
        assert_eq!(found.discount_amount, dec("50"));
        assert_eq!(found.supplier_id, invoice.supplier_id);
        assert!(!found.archived);
        assert!(found.details.is_empty());
    }

    #[tokio::test]
    async fn save_twice_updates_in_place() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);
        let mut invoice = invoice("10");

        repo.save(&invoice).expect("first save failed");
        invoice.amount = dec("25.50");
        repo.save(&invoice).expect("second save failed");

        let all = repo.find_all().expect("find_all failed");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].amount, dec("25.50"));
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown_id() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);

        let result = repo
            .find_by_id(Uuid::new_v4())
            .expect("find should not error");

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn find_all_returns_every_invoice_with_details() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool.clone());
        let details = DieselInvoiceDetailRepository::new(pool.clone());
        let product_id = insert_product(&pool, "100");
        let first = invoice("450");
        let second = invoice("0");
        repo.save(&first).expect("save failed");
        repo.save(&second).expect("save failed");

        let mut line = InvoiceDetail::new(product_id, 5, 10);
        line.invoice_id = Some(first.id);
        line.discount_amount = dec("50");
        line.line_total = dec("450");
        details.save(&line).expect("detail save failed");

        let all = repo.find_all().expect("find_all failed");

        assert_eq!(all.len(), 2);
        let hydrated = all.iter().find(|i| i.id == first.id).expect("first invoice");
        assert_eq!(hydrated.details.len(), 1);
        assert_eq!(hydrated.details[0].line_total, dec("450"));
        let empty = all.iter().find(|i| i.id == second.id).expect("second invoice");
        assert!(empty.details.is_empty());
    }

    #[tokio::test]
    async fn append_details_accumulates_totals_over_batches() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool.clone());
        let product_id = insert_product(&pool, "100");
        let invoice = invoice("0");
        repo.save(&invoice).expect("save failed");

        let mut first = InvoiceDetail::new(product_id, 5, 10);
        first.discount_amount = dec("50");
        first.line_total = dec("450");
        repo.append_details(invoice.id, &[first], Utc::now())
            .expect("first append failed");
        let mut second = InvoiceDetail::new(product_id, 1, 0);
        second.line_total = dec("100");
        let updated = repo
            .append_details(invoice.id, &[second], Utc::now())
            .expect("second append failed");

        assert_eq!(updated.amount, dec("550"));
        assert_eq!(updated.discount_amount, dec("50"));
        assert_eq!(updated.details.len(), 2);
        let stored = repo
            .find_by_id(invoice.id)
            .expect("find failed")
            .expect("invoice should exist");
        assert_eq!(stored.amount, dec("550"));
        assert_eq!(stored.details.len(), 2);
    }

    #[tokio::test]
    async fn append_details_failure_leaves_invoice_and_lines_untouched() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool.clone());
        let product_id = insert_product(&pool, "100");
        let invoice = invoice("0");
        repo.save(&invoice).expect("save failed");
        let mut good = InvoiceDetail::new(product_id, 1, 0);
        good.line_total = dec("100");
        repo.append_details(invoice.id, &[good], Utc::now())
            .expect("append failed");

        // The second line points at no product, so its insert violates the
        // foreign key after the first line of the batch went in.
        let mut fine = InvoiceDetail::new(product_id, 2, 0);
        fine.line_total = dec("200");
        let mut dangling = InvoiceDetail::new(Uuid::new_v4(), 1, 0);
        dangling.line_total = dec("10");
        let err = repo
            .append_details(invoice.id, &[fine, dangling], Utc::now())
            .expect_err("should fail");
        assert!(matches!(err, DomainError::Internal(_)));

        let stored = repo
            .find_by_id(invoice.id)
            .expect("find failed")
            .expect("invoice should exist");
        assert_eq!(stored.amount, dec("100"));
        assert_eq!(stored.details.len(), 1);
    }

    #[tokio::test]
    async fn append_details_to_unknown_invoice_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);

        let err = repo
            .append_details(Uuid::new_v4(), &[], Utc::now())
            .expect_err("should fail");

        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn mark_updated_archives_the_row() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);
        let invoice = invoice("10");
        repo.save(&invoice).expect("save failed");

        repo.mark_updated(invoice.id).expect("mark failed");

        let found = repo
            .find_by_id(invoice.id)
            .expect("find failed")
            .expect("invoice should exist");
        assert!(found.archived);
        assert!(found.updated_at >= invoice.updated_at);
    }

    #[tokio::test]
    async fn mark_updated_unknown_id_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);

        let err = repo.mark_updated(Uuid::new_v4()).expect_err("should fail");

        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn total_amount_between_skips_archived_and_out_of_range() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);
        let now = Utc::now();

        repo.save(&invoice("600")).expect("save failed");
        repo.save(&invoice("400")).expect("save failed");
        let mut archived = invoice("999");
        archived.archived = true;
        repo.save(&archived).expect("save failed");
        let mut old = Invoice::new(now - Duration::days(30));
        old.amount = dec("123");
        repo.save(&old).expect("save failed");

        let total = repo
            .total_amount_between(now - Duration::days(1), now + Duration::days(1))
            .expect("sum failed");

        assert_eq!(total, dec("1000"));
    }

    #[tokio::test]
    async fn total_amount_between_empty_range_is_zero() {
        let (_container, pool) = setup_db().await;
        let repo = DieselInvoiceRepository::new(pool);
        let now = Utc::now();

        let total = repo
            .total_amount_between(now - Duration::days(1), now)
            .expect("sum failed");

        assert_eq!(total, dec("0"));
    }

    #[tokio::test]
    async fn detail_save_requires_an_invoice() {
        let (_container, pool) = setup_db().await;
        let details = DieselInvoiceDetailRepository::new(pool.clone());
        let product_id = insert_product(&pool, "1");

        let err = details
            .save(&InvoiceDetail::new(product_id, 1, 0))
            .expect_err("should fail");

        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
