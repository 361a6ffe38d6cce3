use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::SettlementService;
use crate::schema::settlements;

/// Reads settled revenue straight from the `settlements` table.
pub struct DieselSettlementService {
    pool: DbPool,
}

impl DieselSettlementService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SettlementService for DieselSettlementService {
    fn revenue_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BigDecimal, DomainError> {
        let mut conn = self.pool.get()?;

        let total: Option<BigDecimal> = settlements::table
            .filter(settlements::settled_at.between(start, end))
            .select(sum(settlements::amount_paid))
            .get_result(&mut conn)?;

        Ok(total.unwrap_or_else(BigDecimal::zero))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselSettlementService;
    use crate::domain::invoice::Invoice;
    use crate::domain::ports::{InvoiceRepository, SettlementService};
    use crate::infrastructure::invoice_repo::DieselInvoiceRepository;
    use crate::infrastructure::models::SettlementRow;
    use crate::infrastructure::test_db::{dec, setup_db};
    use crate::schema::settlements;

    #[tokio::test]
    async fn revenue_between_sums_paid_amounts_in_range() {
        let (_container, pool) = setup_db().await;
        let now = Utc::now();
        let invoice = Invoice::new(now);
        DieselInvoiceRepository::new(pool.clone())
            .save(&invoice)
            .expect("save failed");

        let rows: Vec<SettlementRow> = [("300", 0), ("200", 0), ("999", 60)]
            .into_iter()
            .map(|(paid, days_ago)| SettlementRow {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                amount_paid: dec(paid),
                amount_remaining: dec("0"),
                paid: true,
                settled_at: now - Duration::days(days_ago),
            })
            .collect();
        let mut conn = pool.get().expect("Failed to get connection");
        diesel::insert_into(settlements::table)
            .values(&rows)
            .execute(&mut conn)
            .expect("insert failed");

        let service = DieselSettlementService::new(pool);
        let revenue = service
            .revenue_between(now - Duration::days(1), now + Duration::days(1))
            .expect("sum failed");

        assert_eq!(revenue, dec("500"));
    }

    #[tokio::test]
    async fn revenue_between_without_settlements_is_zero() {
        let (_container, pool) = setup_db().await;
        let now = Utc::now();

        let revenue = DieselSettlementService::new(pool)
            .revenue_between(now - Duration::days(1), now)
            .expect("sum failed");

        assert_eq!(revenue, dec("0"));
    }
}
