use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{Product, UserProfile};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::{products, users};

use super::models::{ProductRow, UserRow};

/// Read-only view of the users and products tables, owned by other services.
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|p| Product {
            id: p.id,
            name: p.name,
            price: p.price,
            vendor_id: p.vendor_id,
        }))
    }

    fn find_user(&self, id: Uuid) -> Result<Option<UserProfile>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|u| {
            Ok(UserProfile {
                id: u.id,
                name: u.name,
                email: u.email,
                role: u
                    .role
                    .parse()
                    .map_err(|e| DomainError::Internal(format!("stored role is unreadable: {e}")))?,
                business_name: u.business_name,
                business_address: u.business_address,
                business_phone: u.business_phone,
            })
        })
        .transpose()
    }
}
