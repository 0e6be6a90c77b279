//! Settings file loading and deep merge.

use std::path::Path;

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::MailgateSettings;

/// Deep-merge `overlay` into `base`. Objects merge recursively; every
/// other value type (including arrays) is replaced wholesale.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        let _ = base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, _) => *base_slot = overlay.clone(),
    }
}

/// Load settings from a JSON file: defaults ← file ← env overrides.
pub fn load_settings_from_path(path: &Path) -> Result<MailgateSettings> {
    let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let overlay: Value = serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut merged = serde_json::to_value(MailgateSettings::default()).map_err(|e| {
        SettingsError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    deep_merge(&mut merged, &overlay);

    let settings: MailgateSettings =
        serde_json::from_value(merged).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(settings.with_env_overrides())
}
