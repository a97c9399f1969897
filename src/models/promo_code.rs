use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Stored uppercased; lookups uppercase the client value first.
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_usage: i64,
    pub used_count: i64,
    pub valid_from: DateTime,
    pub valid_until: DateTime,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A promo is redeemable only while active, under its usage cap, and inside
/// its validity window. The usage check deliberately comes before the date
/// check so an exhausted code reports "limit reached" even when expired.
pub fn check_validity(promo: &PromoCode, now: DateTime) -> Result<(), &'static str> {
    if promo.used_count >= promo.max_usage {
        return Err("Promo usage limit reached");
    }
    if now < promo.valid_from || now > promo.valid_until {
        return Err("Promo expired or not valid now");
    }
    Ok(())
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoCodeDto {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub max_usage: Option<i64>,
    /// RFC 3339 timestamps; `valid_from` defaults to now.
    pub valid_from: Option<chrono::DateTime<chrono::Utc>>,
    pub valid_until: chrono::DateTime<chrono::Utc>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromoCodeDto {
    pub code: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub max_usage: Option<i64>,
    pub valid_from: Option<chrono::DateTime<chrono::Utc>>,
    pub valid_until: Option<chrono::DateTime<chrono::Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PromoCodeQueryDto {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(used: i64, max: i64, from_ms: i64, until_ms: i64) -> PromoCode {
        PromoCode {
            id: None,
            code: "SUMMER10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_usage: max,
            used_count: used,
            valid_from: DateTime::from_millis(from_ms),
            valid_until: DateTime::from_millis(until_ms),
            is_active: true,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn valid_inside_window_and_under_cap() {
        let p = promo(0, 5, 1_000, 10_000);
        assert!(check_validity(&p, DateTime::from_millis(5_000)).is_ok());
    }

    #[test]
    fn exhausted_code_rejected_even_inside_window() {
        let p = promo(5, 5, 1_000, 10_000);
        assert_eq!(
            check_validity(&p, DateTime::from_millis(5_000)),
            Err("Promo usage limit reached")
        );
    }

    #[test]
    fn rejected_before_window_opens() {
        let p = promo(0, 5, 5_000, 10_000);
        assert_eq!(
            check_validity(&p, DateTime::from_millis(1_000)),
            Err("Promo expired or not valid now")
        );
    }

    #[test]
    fn rejected_after_window_closes() {
        let p = promo(0, 5, 1_000, 5_000);
        assert_eq!(
            check_validity(&p, DateTime::from_millis(9_000)),
            Err("Promo expired or not valid now")
        );
    }
}
