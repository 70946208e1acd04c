//! Database models.

use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Write whole numbers without a fraction (`100`, not `100.0`).
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Widget configuration for a single shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoreConfig {
    /// Shop identifier. Unique and immutable.
    #[serde(rename = "shopId")]
    pub shop_id: String,
    /// Store contact name.
    pub name: String,
    /// Store contact phone number.
    #[serde(rename = "mobileNumber")]
    pub mobile_number: String,
    pub title: String,
    /// Order total that unlocks free shipping.
    #[serde(serialize_with = "serialize_number")]
    pub goal_amount: f64,
    pub initial_message: String,
    pub progress_message: String,
    pub goal_achieved_message: String,
    pub currency_symbol: String,
    /// Where the currency symbol goes relative to the amount ("before" or "after").
    pub symbol_position: String,
    pub bg_color: String,
    pub text_color: String,
    pub special_text_color: String,
    pub font_family: String,
    #[serde(serialize_with = "serialize_number")]
    pub font_size: f64,
    /// Creation timestamp (ISO-8601, UTC).
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Last write timestamp (ISO-8601, UTC).
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
