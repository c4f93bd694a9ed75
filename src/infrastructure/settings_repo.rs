use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::SettingsRepository;
use crate::schema::settings;

use super::models::NewSettingRow;

const DELIVERY_CHARGE_KEY: &str = "delivery_charge";

pub struct DieselSettingsRepository {
    pool: DbPool,
}

impl DieselSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SettingsRepository for DieselSettingsRepository {
    fn delivery_charge(&self) -> Result<Option<BigDecimal>, DomainError> {
        let mut conn = self.pool.get()?;
        let value = settings::table
            .find(DELIVERY_CHARGE_KEY)
            .select(settings::value)
            .first::<BigDecimal>(&mut conn)
            .optional()?;
        Ok(value)
    }

    fn set_delivery_charge(&self, value: &BigDecimal) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        diesel::insert_into(settings::table)
            .values(&NewSettingRow {
                key: DELIVERY_CHARGE_KEY.to_string(),
                value: value.clone(),
                updated_at: now,
            })
            .on_conflict(settings::key)
            .do_update()
            .set((settings::value.eq(value), settings::updated_at.eq(now)))
            .execute(&mut conn)?;
        Ok(())
    }
}
