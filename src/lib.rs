pub mod bass;
pub mod codec;
pub mod drum;
pub mod dsp;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod sequencer;
pub mod state;

use crate::codec::ShareMode;
use crate::error::{AcidError, CodecError};
use crate::state::ProjectState;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the acid-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Load a saved project (any supported version) and encode it as
/// URL-fragment text.
pub fn export_project_text(state_json: &str, mode: ShareMode) -> Result<String, AcidError> {
    let state = state::load_state_json(state_json)?;
    Ok(codec::export_text(&state, mode))
}

/// Decode URL-fragment text into a fresh project.
pub fn import_project_text(fragment: &str) -> Result<ProjectState, AcidError> {
    Ok(codec::import_text(fragment, ProjectState::default())?)
}

/// WASM-exposed: encode a project JSON string for sharing.
/// `mode` is 0 (pattern), 1 (song only) or 2 (full).
#[wasm_bindgen]
pub fn export_project(state_json: &str, mode: u8) -> Result<String, JsValue> {
    let mode = ShareMode::from_code(mode).ok_or_else(|| JsValue::from_str(&format!("Unknown share mode {mode}")))?;
    export_project_text(state_json, mode).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: decode shared text into a project state object.
#[wasm_bindgen]
pub fn import_project(fragment: &str) -> Result<JsValue, JsValue> {
    let state = import_project_text(fragment).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    serde_wasm_bindgen::to_value(&state).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: upgrade a saved project of any supported version to the
/// current layout.
#[wasm_bindgen]
pub fn migrate_project(state_json: &str) -> Result<String, JsValue> {
    let state = state::load_state_json(state_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    state::save_state_json(&state).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render `bars` bars of a project to a WAV byte array.
#[wasm_bindgen]
pub fn render_project_wav(state_json: &str, bars: u32, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let state = state::load_state_json(state_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(dsp::renderer::render_wav(&state, bars, sample_rate))
}

/// Decode URL-fragment text, falling back to a default project when the
/// text is unusable.
pub fn import_project_or_default(fragment: &str) -> ProjectState {
    match codec::from_base64url(fragment) {
        Ok(bytes) => codec::decode_or_default(&bytes),
        Err(e) => {
            log::warn!("{}; starting from a default project", AcidError::from(e));
            ProjectState::default()
        }
    }
}
