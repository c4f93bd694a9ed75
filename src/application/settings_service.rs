use std::sync::Arc;

use bigdecimal::BigDecimal;
use log::info;

use crate::domain::actor::{Actor, Role};
use crate::domain::errors::DomainError;
use crate::domain::ports::SettingsRepository;

/// Runtime-adjustable settings. Values are read from storage on every call
/// so every instance of the service sees an update immediately.
#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    default_delivery_charge: BigDecimal,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, default_delivery_charge: BigDecimal) -> Self {
        Self {
            repo,
            default_delivery_charge,
        }
    }

    pub fn delivery_charge(&self) -> Result<BigDecimal, DomainError> {
        Ok(self
            .repo
            .delivery_charge()?
            .unwrap_or_else(|| self.default_delivery_charge.clone()))
    }

    pub fn set_delivery_charge(&self, actor: &Actor, value: BigDecimal) -> Result<BigDecimal, DomainError> {
        actor.require(Role::Admin, "change the delivery charge")?;
        if value < BigDecimal::from(0) {
            return Err(DomainError::invalid(
                "delivery_charge",
                "Delivery charge must not be negative",
            ));
        }
        let value = value.with_scale(2);
        self.repo.set_delivery_charge(&value)?;
        info!("Delivery charge set to {value} by {}", actor.label());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    fn service() -> SettingsService {
        SettingsService::new(Arc::new(InMemoryStore::new()), BigDecimal::from(30))
    }

    #[test]
    fn falls_back_to_the_configured_default() {
        assert_eq!(service().delivery_charge().unwrap(), BigDecimal::from(30));
    }

    #[test]
    fn admin_updates_are_visible_on_next_read() {
        let settings = service();
        let admin = Actor::new(Uuid::new_v4(), Role::Admin, "Ops");

        settings.set_delivery_charge(&admin, BigDecimal::from(45)).unwrap();

        assert_eq!(settings.delivery_charge().unwrap(), BigDecimal::from(45));
    }

    #[test]
    fn only_admins_may_change_it() {
        let vendor = Actor::new(Uuid::new_v4(), Role::Vendor, "Shop");
        let err = service()
            .set_delivery_charge(&vendor, BigDecimal::from(10))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn negative_values_are_rejected() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin, "Ops");
        let err = service()
            .set_delivery_charge(&admin, BigDecimal::from(-1))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidInput {
                field: Some("delivery_charge"),
                ..
            }
        ));
    }
}
