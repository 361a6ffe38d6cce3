use std::collections::BTreeSet;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::invoice::Operator;
use crate::domain::ports::OperatorRepository;
use crate::schema::{operator_invoices, operators};

use super::models::{OperatorInvoiceRow, OperatorRow};

pub struct DieselOperatorRepository {
    pool: DbPool,
}

impl DieselOperatorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn assigned_invoices(conn: &mut PgConnection, operator_id: Uuid) -> QueryResult<BTreeSet<Uuid>> {
    Ok(operator_invoices::table
        .filter(operator_invoices::operator_id.eq(operator_id))
        .select(operator_invoices::invoice_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect())
}

impl OperatorRepository for DieselOperatorRepository {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Operator>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = operators::table
            .find(id)
            .select(OperatorRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let invoices = assigned_invoices(&mut conn, row.id)?;
        Ok(Some(Operator {
            id: row.id,
            last_name: row.last_name,
            first_name: row.first_name,
            invoices,
        }))
    }

    /// Upserts the operator and makes the association table match its
    /// invoice set, all in one transaction. An invoice held by another
    /// operator moves to this one.
    fn save(&self, operator: &Operator) -> Result<Operator, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::insert_into(operators::table)
                .values(&OperatorRow {
                    id: operator.id,
                    last_name: operator.last_name.clone(),
                    first_name: operator.first_name.clone(),
                })
                .on_conflict(operators::id)
                .do_update()
                .set((
                    operators::last_name.eq(excluded(operators::last_name)),
                    operators::first_name.eq(excluded(operators::first_name)),
                ))
                .returning(OperatorRow::as_returning())
                .get_result(conn)?;

            let wanted: Vec<Uuid> = operator.invoices.iter().copied().collect();
            diesel::delete(
                operator_invoices::table
                    .filter(operator_invoices::operator_id.eq(row.id))
                    .filter(operator_invoices::invoice_id.ne_all(wanted.clone())),
            )
            .execute(conn)?;

            if !wanted.is_empty() {
                let links: Vec<OperatorInvoiceRow> = wanted
                    .iter()
                    .map(|invoice_id| OperatorInvoiceRow {
                        invoice_id: *invoice_id,
                        operator_id: row.id,
                    })
                    .collect();
                diesel::insert_into(operator_invoices::table)
                    .values(&links)
                    .on_conflict(operator_invoices::invoice_id)
                    .do_update()
                    .set(operator_invoices::operator_id.eq(excluded(operator_invoices::operator_id)))
                    .execute(conn)?;
            }

            let invoices = assigned_invoices(conn, row.id)?;
            Ok(Operator {
                id: row.id,
                last_name: row.last_name,
                first_name: row.first_name,
                invoices,
            })
        })
    }
}
