//! Store configuration reads and upsert-merge writes.

use serde_json::{Map, Value};
use sqlx::query::QueryAs;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::StoreConfig;
use crate::schema::{defaults_for, ConfigField, ConfigPatch, ConfigValue};

const ENTITY: &str = "StoreConfig";

/// Current UTC time with millisecond precision, sortable as text.
const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const COLUMNS: &str = "shop_id, name, mobile_number, title, goal_amount, initial_message, \
    progress_message, goal_achieved_message, currency_symbol, symbol_position, bg_color, \
    text_color, special_text_color, font_family, font_size, created_at, updated_at";

/// Get a store configuration by shop ID.
///
/// Never fills in defaults: a shop without a row is `NotFound`.
pub async fn get_store_config(pool: &SqlitePool, shop_id: &str) -> Result<StoreConfig> {
    let query = format!("SELECT {COLUMNS} FROM store_configs WHERE shop_id = ?");

    sqlx::query_as::<_, StoreConfig>(&query)
        .bind(shop_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: ENTITY,
            id: shop_id.to_string(),
        })
}

/// Check whether a shop already has a configuration.
pub async fn store_config_exists(pool: &SqlitePool, shop_id: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM store_configs WHERE shop_id = ?)")
            .bind(shop_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

/// Merge a loosely-typed JSON payload into a shop's configuration.
///
/// `shopId` inside the payload is ignored; the row is always keyed by
/// `shop_id`. See [`upsert_store_config_patch`] for the merge rules.
pub async fn upsert_store_config(
    pool: &SqlitePool,
    shop_id: &str,
    payload: &Map<String, Value>,
) -> Result<StoreConfig> {
    require_shop_id(shop_id)?;
    let patch = ConfigPatch::from_json(payload)?;
    upsert_store_config_patch(pool, shop_id, &patch).await
}

/// Merge a validated patch into a shop's configuration.
///
/// A new shop must supply `name` and `mobileNumber`; every other field it
/// omits takes its schema default. An existing shop accepts any subset of
/// fields and only those change. Validation runs before any write, and each
/// successful call performs exactly one write.
pub async fn upsert_store_config_patch(
    pool: &SqlitePool,
    shop_id: &str,
    patch: &ConfigPatch,
) -> Result<StoreConfig> {
    require_shop_id(shop_id)?;

    // Advisory only. The create branch stays correct if another writer
    // creates the row after this check.
    let exists = store_config_exists(pool, shop_id).await?;
    let (config, created) = merge_after_check(pool, shop_id, patch, exists).await?;

    tracing::info!(shop_id, fields = patch.len(), created, "Merged store config");
    Ok(config)
}

/// Run the branch chosen by the existence check. Returns the row and whether
/// this call created it.
async fn merge_after_check(
    pool: &SqlitePool,
    shop_id: &str,
    patch: &ConfigPatch,
    exists: bool,
) -> Result<(StoreConfig, bool)> {
    if exists {
        if let Some(config) = update_existing(pool, shop_id, patch).await? {
            return Ok((config, false));
        }
        tracing::warn!(shop_id, "Store config vanished before update, creating instead");
    }

    ensure_creatable(patch)?;
    let config = create_or_merge(pool, shop_id, patch).await?;
    Ok((config, true))
}

fn require_shop_id(shop_id: &str) -> Result<()> {
    if shop_id.trim().is_empty() {
        return Err(DatabaseError::InvalidRequest("shopId is required".to_string()));
    }
    Ok(())
}

fn ensure_creatable(patch: &ConfigPatch) -> Result<()> {
    let missing = patch.missing_required();
    if missing.is_empty() {
        return Ok(());
    }

    let names: Vec<&str> = missing.iter().map(ConfigField::wire_name).collect();
    Err(DatabaseError::InvalidRequest(format!(
        "Missing required fields for new store: {}",
        names.join(", ")
    )))
}

/// Update only the patched columns. Returns `None` when the row is absent.
async fn update_existing(
    pool: &SqlitePool,
    shop_id: &str,
    patch: &ConfigPatch,
) -> Result<Option<StoreConfig>> {
    let mut assignments: Vec<String> = patch
        .iter()
        .map(|(field, _)| format!("{} = ?", field.column_name()))
        .collect();
    assignments.push(format!("updated_at = max(updated_at, {NOW})"));

    let query = format!(
        "UPDATE store_configs SET {} WHERE shop_id = ? RETURNING {COLUMNS}",
        assignments.join(", ")
    );

    let mut statement = sqlx::query_as::<_, StoreConfig>(&query);
    for (_, value) in patch.iter() {
        statement = bind_value(statement, value);
    }

    let config = statement.bind(shop_id).fetch_optional(pool).await?;
    Ok(config)
}

/// Insert a defaulted row, or merge the patch if the row appeared meanwhile.
///
/// A single statement, so two concurrent creators never produce two rows:
/// the loser hits the primary key and takes the `DO UPDATE` path.
async fn create_or_merge(
    pool: &SqlitePool,
    shop_id: &str,
    patch: &ConfigPatch,
) -> Result<StoreConfig> {
    let mut row = defaults_for(patch);
    row.extend(patch.iter().map(|(field, value)| (field, value.clone())));

    let columns: Vec<&str> = row.keys().map(ConfigField::column_name).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");

    let mut assignments: Vec<String> = patch
        .iter()
        .map(|(field, _)| {
            let column = field.column_name();
            format!("{column} = excluded.{column}")
        })
        .collect();
    assignments.push("updated_at = max(store_configs.updated_at, excluded.updated_at)".to_string());

    let query = format!(
        r#"
        INSERT INTO store_configs (shop_id, {columns}, created_at, updated_at)
        VALUES (?, {placeholders}, {NOW}, {NOW})
        ON CONFLICT(shop_id) DO UPDATE SET
            {assignments}
        RETURNING {COLUMNS}
        "#,
        columns = columns.join(", "),
        assignments = assignments.join(", "),
    );

    let mut statement = sqlx::query_as::<_, StoreConfig>(&query).bind(shop_id);
    for value in row.values() {
        statement = bind_value(statement, value);
    }

    let config = statement.fetch_one(pool).await?;
    Ok(config)
}

fn bind_value<'q>(
    statement: QueryAs<'q, Sqlite, StoreConfig, SqliteArguments<'q>>,
    value: &ConfigValue,
) -> QueryAs<'q, Sqlite, StoreConfig, SqliteArguments<'q>> {
    match value {
        ConfigValue::Text(text) => statement.bind(text.clone()),
        ConfigValue::Number(number) => statement.bind(*number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde_json::json;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be a JSON object"),
        }
    }

    async fn count_rows(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM store_configs")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn seed(db: &Database, shop_id: &str) -> StoreConfig {
        upsert_store_config(
            db.pool(),
            shop_id,
            &payload(json!({ "name": "Acme", "mobileNumber": "+15550100" })),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let db = test_db().await;
        let result = get_store_config(db.pool(), "unknown").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        assert_eq!(count_rows(&db).await, 0);
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let db = test_db().await;
        let config = seed(&db, "shop1").await;

        assert_eq!(config.shop_id, "shop1");
        assert_eq!(config.name, "Acme");
        assert_eq!(config.mobile_number, "+15550100");
        assert_eq!(config.title, "Free Shipping Bar");
        assert_eq!(config.goal_amount, 100.0);
        assert_eq!(config.initial_message, "Free shipping for orders over {goal_amount}!");
        assert_eq!(config.progress_message, "You're {goal_amount} away from free shipping!");
        assert_eq!(config.goal_achieved_message, "Enjoy!! You've got free shipping!");
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.symbol_position, "before");
        assert_eq!(config.bg_color, "#f5f5f5");
        assert_eq!(config.text_color, "#333333");
        assert_eq!(config.special_text_color, "#008060");
        assert_eq!(config.font_family, "sans-serif");
        assert_eq!(config.font_size, 14.0);
        assert!(!config.created_at.is_empty());
        assert_eq!(config.created_at, config.updated_at);

        let fetched = get_store_config(db.pool(), "shop1").await.unwrap();
        assert_eq!(fetched, config);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_values() {
        let db = test_db().await;
        let config = upsert_store_config(
            db.pool(),
            "shop1",
            &payload(json!({
                "name": "Acme",
                "mobileNumber": "+15550100",
                "goal_amount": 50,
                "currency_symbol": "€",
                "symbol_position": "after",
            })),
        )
        .await
        .unwrap();

        assert_eq!(config.goal_amount, 50.0);
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(config.symbol_position, "after");
        assert_eq!(config.font_size, 14.0);
    }

    #[tokio::test]
    async fn test_create_requires_name_and_mobile_number() {
        let db = test_db().await;

        let result =
            upsert_store_config(db.pool(), "shop1", &payload(json!({ "title": "X" }))).await;
        match result {
            Err(DatabaseError::InvalidRequest(message)) => {
                assert!(message.contains("name"));
                assert!(message.contains("mobileNumber"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let result = upsert_store_config(
            db.pool(),
            "shop1",
            &payload(json!({ "name": "Acme", "mobileNumber": "" })),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::InvalidRequest(_))));

        assert_eq!(count_rows(&db).await, 0);
    }

    #[tokio::test]
    async fn test_empty_shop_id_rejected() {
        let db = test_db().await;
        let result = upsert_store_config(
            db.pool(),
            " ",
            &payload(json!({ "name": "Acme", "mobileNumber": "+15550100" })),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::InvalidRequest(_))));
        assert_eq!(count_rows(&db).await, 0);
    }

    #[tokio::test]
    async fn test_partial_update_preserves_untouched_fields() {
        let db = test_db().await;
        seed(&db, "shop1").await;

        upsert_store_config(db.pool(), "shop1", &payload(json!({ "bg_color": "#fff" })))
            .await
            .unwrap();
        let config =
            upsert_store_config(db.pool(), "shop1", &payload(json!({ "font_size": 20 })))
                .await
                .unwrap();

        assert_eq!(config.bg_color, "#fff");
        assert_eq!(config.font_size, 20.0);
        assert_eq!(config.name, "Acme");
        assert_eq!(config.title, "Free Shipping Bar");
    }

    #[tokio::test]
    async fn test_update_does_not_reapply_defaults() {
        let db = test_db().await;
        upsert_store_config(
            db.pool(),
            "shop1",
            &payload(json!({ "name": "Acme", "mobileNumber": "+1", "title": "Custom" })),
        )
        .await
        .unwrap();

        let config = upsert_store_config(db.pool(), "shop1", &payload(json!({ "name": "Acme 2" })))
            .await
            .unwrap();

        assert_eq!(config.name, "Acme 2");
        assert_eq!(config.title, "Custom");
    }

    #[tokio::test]
    async fn test_idempotent_upsert() {
        let db = test_db().await;
        let body = payload(json!({
            "name": "Acme",
            "mobileNumber": "+15550100",
            "goal_amount": 75,
            "bg_color": "#000000",
        }));

        let first = upsert_store_config(db.pool(), "shop1", &body).await.unwrap();
        let second = upsert_store_config(db.pool(), "shop1", &body).await.unwrap();

        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(
            StoreConfig {
                updated_at: first.updated_at.clone(),
                ..second
            },
            first
        );
        assert_eq!(count_rows(&db).await, 1);
    }

    #[tokio::test]
    async fn test_empty_update_touches_only_updated_at() {
        let db = test_db().await;
        let created = seed(&db, "shop1").await;

        let updated = upsert_store_config(db.pool(), "shop1", &payload(json!({ "shopId": "shop1" })))
            .await
            .unwrap();

        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.bg_color, created.bg_color);
    }

    #[tokio::test]
    async fn test_payload_shop_id_cannot_rename() {
        let db = test_db().await;
        let config = upsert_store_config(
            db.pool(),
            "shop1",
            &payload(json!({
                "shopId": "other",
                "name": "Acme",
                "mobileNumber": "+15550100",
            })),
        )
        .await
        .unwrap();
        assert_eq!(config.shop_id, "shop1");

        upsert_store_config(
            db.pool(),
            "shop1",
            &payload(json!({ "shopId": "other", "title": "Y" })),
        )
        .await
        .unwrap();

        assert!(matches!(
            get_store_config(db.pool(), "other").await,
            Err(DatabaseError::NotFound { .. })
        ));
        assert_eq!(get_store_config(db.pool(), "shop1").await.unwrap().title, "Y");
        assert_eq!(count_rows(&db).await, 1);
    }

    #[tokio::test]
    async fn test_schema_violation_writes_nothing() {
        let db = test_db().await;
        let created = seed(&db, "shop1").await;

        let result = upsert_store_config(
            db.pool(),
            "shop1",
            &payload(json!({ "bg_color": "#fff", "font_size": "large" })),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::SchemaViolation { .. })));

        let result =
            upsert_store_config(db.pool(), "shop2", &payload(json!({ "name": null }))).await;
        assert!(matches!(result, Err(DatabaseError::SchemaViolation { .. })));

        let fetched = get_store_config(db.pool(), "shop1").await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(count_rows(&db).await, 1);
    }

    #[tokio::test]
    async fn test_create_or_merge_handles_existing_row() {
        // Simulates losing the creation race: the advisory check saw no row,
        // but one exists by the time the insert runs.
        let db = test_db().await;
        seed(&db, "shop1").await;
        upsert_store_config(db.pool(), "shop1", &payload(json!({ "bg_color": "#fff" })))
            .await
            .unwrap();

        let patch = ConfigPatch::new()
            .with(ConfigField::Name, "Racer")
            .unwrap()
            .with(ConfigField::MobileNumber, "+2")
            .unwrap();
        let config = create_or_merge(db.pool(), "shop1", &patch).await.unwrap();

        assert_eq!(config.name, "Racer");
        assert_eq!(config.mobile_number, "+2");
        assert_eq!(config.bg_color, "#fff");
        assert_eq!(count_rows(&db).await, 1);
    }

    #[tokio::test]
    async fn test_vanished_row_falls_back_to_create_rules() {
        // The existence check reported a row that is gone by the time of the update.
        let db = test_db().await;

        let partial = ConfigPatch::new().with(ConfigField::Title, "X").unwrap();
        let result = merge_after_check(db.pool(), "shop1", &partial, true).await;
        assert!(matches!(result, Err(DatabaseError::InvalidRequest(_))));
        assert_eq!(count_rows(&db).await, 0);

        let full = partial
            .with(ConfigField::Name, "Acme")
            .unwrap()
            .with(ConfigField::MobileNumber, "+15550100")
            .unwrap();
        let (config, created) = merge_after_check(db.pool(), "shop1", &full, true)
            .await
            .unwrap();
        assert!(created);
        assert_eq!(config.title, "X");
        assert_eq!(config.font_size, 14.0);
        assert_eq!(count_rows(&db).await, 1);

        let (_, created) = merge_after_check(db.pool(), "shop1", &full, true)
            .await
            .unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn test_update_existing_missing_row() {
        let db = test_db().await;
        let patch = ConfigPatch::new().with(ConfigField::Title, "X").unwrap();
        let result = update_existing(db.pool(), "shop1", &patch).await.unwrap();
        assert!(result.is_none());
        assert_eq!(count_rows(&db).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_creates_produce_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("store.db").display());
        let db = Database::connect_with_pool_size(&url, 8).await.unwrap();
        db.migrate().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let body = payload(json!({
                    "name": format!("Writer {i}"),
                    "mobileNumber": "+15550100",
                    "font_size": i,
                }));
                upsert_store_config(db.pool(), "shop1", &body).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(count_rows(&db).await, 1);

        let config = get_store_config(db.pool(), "shop1").await.unwrap();
        let writer: f64 = config
            .name
            .trim_start_matches("Writer ")
            .parse()
            .unwrap();
        // Both fields come from the same payload, since each write is one statement.
        assert_eq!(config.font_size, writer);

        db.close().await;
    }
}
