use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::CartLine;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::cart_items;

use super::models::CartItemRow;

diesel::define_sql_function! {
    fn greatest(a: Integer, b: Integer) -> Integer;
}

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_lines(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
    let rows = cart_items::table
        .filter(cart_items::user_id.eq(user_id))
        .order(cart_items::product_id.asc())
        .select(CartItemRow::as_select())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|r| CartLine {
            product_id: r.product_id,
            quantity: r.quantity,
        })
        .collect())
}

impl CartRepository for DieselCartRepository {
    fn items(&self, user_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let mut conn = self.pool.get()?;
        load_lines(&mut conn, user_id)
    }

    fn add(&self, user_id: Uuid, product_id: Uuid, delta: i32) -> Result<Vec<CartLine>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Single upsert; the clamp keeps the quantity check constraint happy.
            diesel::insert_into(cart_items::table)
                .values(&CartItemRow {
                    user_id,
                    product_id,
                    quantity: delta.max(1),
                })
                .on_conflict((cart_items::user_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(greatest(cart_items::quantity + delta, 1)))
                .execute(conn)?;
            load_lines(conn, user_id)
        })
    }

    fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::delete(
                cart_items::table
                    .filter(cart_items::user_id.eq(user_id))
                    .filter(cart_items::product_id.eq(product_id)),
            )
            .execute(conn)?;
            load_lines(conn, user_id)
        })
    }

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(cart_items::table.filter(cart_items::user_id.eq(user_id)))
            .execute(&mut conn)?;
        Ok(())
    }
}
