//! Host session state: the flat key/value chunk a host stores with its
//! project and hands back on reload.

use serde_json::{Map, Number, Value};

use crate::fader::FADER_UNITY;
use crate::params::{ParamStore, PARAM_NAMES};

pub const MASTER_VOLUME_KEY: &str = "MasterVolume";
pub const MASTER_PAN_KEY: &str = "MasterPan";

/// Serializes the live parameter set plus the master section, one entry per
/// parameter name.
pub fn save_session_state(store: &ParamStore) -> anyhow::Result<Vec<u8>> {
    let snapshot = store.snapshot();
    let mut map = Map::new();
    for (index, name) in PARAM_NAMES.iter().enumerate() {
        map.insert((*name).to_string(), number(snapshot[index]));
    }
    map.insert(MASTER_VOLUME_KEY.to_string(), number(store.master_volume()));
    map.insert(MASTER_PAN_KEY.to_string(), number(store.master_pan()));
    Ok(serde_json::to_vec(&Value::Object(map))?)
}

/// Restores a chunk produced by [`save_session_state`]. Parameters missing
/// from the chunk keep their current values; unknown keys are ignored.
pub fn load_session_state(store: &ParamStore, data: &[u8]) -> anyhow::Result<()> {
    let value: Value = serde_json::from_slice(data)?;
    let map = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("session state is not a key/value object"))?;

    let mut values = store.snapshot();
    for (index, name) in PARAM_NAMES.iter().enumerate() {
        if let Some(stored) = map.get(*name).and_then(Value::as_f64) {
            values[index] = stored as f32;
        }
    }
    store.apply_values(&values);

    let volume = map
        .get(MASTER_VOLUME_KEY)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(FADER_UNITY);
    store.set_master_volume(volume);

    let pan = map
        .get(MASTER_PAN_KEY)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .unwrap_or(0.5);
    store.set_master_pan(pan);

    Ok(())
}

fn number(value: f32) -> Value {
    Number::from_f64(value as f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0.0))
}
