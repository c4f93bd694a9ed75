use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::DomainError;

pub const SERVICE_CHARGE_PERCENT: u32 = 5;
pub const GST_PERCENT: u32 = 5;
pub const PLATFORM_FEE_PERCENT: u32 = 2;

/// Order-level charge breakdown. `grand_total` is always the sum of the other
/// fields; every constructor re-derives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Charges {
    #[schema(value_type = String)]
    pub items_total: BigDecimal,
    #[schema(value_type = String)]
    pub service_charge: BigDecimal,
    #[schema(value_type = String)]
    pub gst: BigDecimal,
    #[schema(value_type = String)]
    pub platform_fee: BigDecimal,
    #[schema(value_type = String)]
    pub delivery_charge: BigDecimal,
    #[schema(value_type = String)]
    pub tip: BigDecimal,
    #[schema(value_type = String)]
    pub grand_total: BigDecimal,
}

fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

fn percent(base: &BigDecimal, pct: u32) -> BigDecimal {
    round2(&(base * BigDecimal::from(pct) / BigDecimal::from(100)))
}

fn non_negative(field: &'static str, value: &BigDecimal) -> Result<BigDecimal, DomainError> {
    if *value < BigDecimal::from(0) {
        return Err(DomainError::invalid(field, format!("{field} must not be negative")));
    }
    Ok(round2(value))
}

impl Charges {
    /// Builds the breakdown for a new order from the item subtotal, the
    /// current delivery charge setting and the customer's tip.
    pub fn compute(
        items_total: &BigDecimal,
        delivery_charge: &BigDecimal,
        tip: &BigDecimal,
    ) -> Result<Self, DomainError> {
        let items_total = non_negative("items_total", items_total)?;
        let service_charge = percent(&items_total, SERVICE_CHARGE_PERCENT);
        let gst = percent(&(&items_total + &service_charge), GST_PERCENT);
        let platform_fee = percent(&items_total, PLATFORM_FEE_PERCENT);
        let mut charges = Charges {
            items_total,
            service_charge,
            gst,
            platform_fee,
            delivery_charge: non_negative("delivery_charge", delivery_charge)?,
            tip: non_negative("tip", tip)?,
            grand_total: BigDecimal::from(0),
        };
        charges.grand_total = charges.component_sum();
        Ok(charges)
    }

    pub fn with_delivery_charge(&self, delivery_charge: &BigDecimal) -> Result<Self, DomainError> {
        let mut next = self.clone();
        next.delivery_charge = non_negative("delivery_charge", delivery_charge)?;
        next.grand_total = next.component_sum();
        Ok(next)
    }

    pub fn with_items_total(&self, items_total: &BigDecimal) -> Result<Self, DomainError> {
        let mut next = self.clone();
        next.items_total = non_negative("items_total", items_total)?;
        next.grand_total = next.component_sum();
        Ok(next)
    }

    pub fn component_sum(&self) -> BigDecimal {
        &self.items_total
            + &self.service_charge
            + &self.gst
            + &self.platform_fee
            + &self.delivery_charge
            + &self.tip
    }

    pub fn is_consistent(&self) -> bool {
        self.grand_total == self.component_sum()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn compute_breaks_down_a_two_product_cart() {
        // 2 x 100 + 1 x 50
        let charges = Charges::compute(&dec("250"), &dec("30"), &dec("0")).unwrap();

        assert_eq!(charges.items_total, dec("250"));
        assert_eq!(charges.service_charge, dec("12.50"));
        assert_eq!(charges.gst, dec("13.13"));
        assert_eq!(charges.platform_fee, dec("5.00"));
        assert_eq!(charges.delivery_charge, dec("30"));
        assert_eq!(charges.grand_total, dec("310.63"));
        assert!(charges.is_consistent());
    }

    #[test]
    fn tip_is_part_of_grand_total() {
        let charges = Charges::compute(&dec("100"), &dec("0"), &dec("20")).unwrap();
        assert_eq!(charges.grand_total, dec("100") + dec("5") + dec("5.25") + dec("2") + dec("20"));
    }

    #[test]
    fn negative_tip_is_rejected() {
        let err = Charges::compute(&dec("100"), &dec("30"), &dec("-1")).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput { field: Some("tip"), .. }));
    }

    #[test]
    fn delivery_charge_override_rederives_grand_total() {
        let charges = Charges::compute(&dec("250"), &dec("30"), &dec("0")).unwrap();
        let updated = charges.with_delivery_charge(&dec("45")).unwrap();

        assert_eq!(updated.delivery_charge, dec("45"));
        assert_eq!(updated.grand_total, dec("325.63"));
        assert!(updated.is_consistent());
    }

    #[test]
    fn negative_delivery_charge_is_rejected() {
        let charges = Charges::compute(&dec("250"), &dec("30"), &dec("0")).unwrap();
        assert!(charges.with_delivery_charge(&dec("-5")).is_err());
    }

    #[test]
    fn items_total_change_keeps_fees_and_rederives_total() {
        let charges = Charges::compute(&dec("250"), &dec("30"), &dec("0")).unwrap();
        let updated = charges.with_items_total(&dec("200")).unwrap();

        assert_eq!(updated.service_charge, charges.service_charge);
        assert_eq!(updated.grand_total, dec("260.63"));
        assert!(updated.is_consistent());
    }

    #[test]
    fn tampered_total_is_detected() {
        let mut charges = Charges::compute(&dec("250"), &dec("30"), &dec("0")).unwrap();
        charges.grand_total = dec("1");
        assert!(!charges.is_consistent());
    }
}
