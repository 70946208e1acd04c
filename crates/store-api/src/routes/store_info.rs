//! Store info routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use database::schema::SHOP_ID_FIELD;
use database::{store_config, StoreConfig};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Query string for `GET /store-info`.
#[derive(Debug, Deserialize)]
pub struct StoreInfoQuery {
    #[serde(rename = "shopId")]
    pub shop_id: Option<String>,
}

/// Fetch a shop's configuration.
pub async fn get_store_info(
    State(state): State<AppState>,
    Query(query): Query<StoreInfoQuery>,
) -> Result<Json<StoreConfig>> {
    let shop_id = query
        .shop_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("shopId query parameter is required.".to_string()))?;

    let config = store_config::get_store_config(state.db.pool(), &shop_id)
        .await
        .map_err(ApiError::from_read)?;

    Ok(Json(config))
}

/// Create or partially update a shop's configuration.
pub async fn upsert_store_info(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<StoreConfig>> {
    let Json(body) = body?;
    let Value::Object(payload) = body else {
        return Err(ApiError::BadRequest(
            "Request body must be a JSON object.".to_string(),
        ));
    };

    let shop_id = match payload.get(SHOP_ID_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        _ => return Err(ApiError::BadRequest("shopId is required.".to_string())),
    };

    tracing::info!(shop_id = %shop_id, fields = payload.len(), "Upserting store info");

    let config = store_config::upsert_store_config(state.db.pool(), &shop_id, &payload)
        .await
        .map_err(ApiError::from_write)?;

    Ok(Json(config))
}
