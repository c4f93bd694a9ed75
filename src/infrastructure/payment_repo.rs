use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::payment::PaymentIntent;
use crate::domain::ports::PaymentRepository;
use crate::schema::payment_intents;

use super::models::PaymentIntentRow;

pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<PaymentIntentRow> for PaymentIntent {
    fn from(row: PaymentIntentRow) -> Self {
        PaymentIntent {
            gateway_order_id: row.gateway_order_id,
            customer_id: row.customer_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            created_at: row.created_at,
        }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn record_intent(&self, intent: &PaymentIntent) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(payment_intents::table)
            .values(&PaymentIntentRow {
                gateway_order_id: intent.gateway_order_id.clone(),
                customer_id: intent.customer_id,
                amount_minor: intent.amount_minor,
                currency: intent.currency.clone(),
                created_at: intent.created_at,
            })
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_intent(&self, gateway_order_id: &str) -> Result<Option<PaymentIntent>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = payment_intents::table
            .find(gateway_order_id)
            .select(PaymentIntentRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(PaymentIntent::from))
    }
}
