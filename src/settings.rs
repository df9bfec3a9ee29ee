//! Site settings: one shared JSON document of feature flags (`showPremios`,
//! `votingActive`, ...). Reads are public and an unset document reads as
//! `{}`. Writes replace the whole document; two admins writing concurrently
//! is last-writer-wins with no version check, and callers wanting merge
//! semantics must read-then-write themselves.

use serde_json::{Map, Value};

use crate::{
    database::KeyValueStore,
    error::{AppError, AppResult},
};

pub const SETTINGS_KEY: &str = "site:settings";

/// Fetches the settings document. Absence is the normal initial state, not
/// an error.
pub async fn read(store: &dyn KeyValueStore) -> AppResult<Map<String, Value>> {
    match store.get(SETTINGS_KEY).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| AppError::Storage(format!("stored settings are not valid JSON: {e}"))),
        None => Ok(Map::new()),
    }
}

/// Overwrites the stored document with exactly `document`. Rejects
/// non-object input before touching the store.
pub async fn write(store: &dyn KeyValueStore, document: Value) -> AppResult<Map<String, Value>> {
    let Value::Object(flags) = document else {
        return Err(AppError::Validation(
            "Settings must be a JSON object".to_string(),
        ));
    };

    let serialized = serde_json::to_string(&flags)
        .map_err(|e| AppError::Storage(format!("failed to serialize settings: {e}")))?;
    store.set(SETTINGS_KEY, &serialized).await?;

    Ok(flags)
}
