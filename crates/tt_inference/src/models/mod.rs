use std::sync::Arc;

use tracing::info;
use tt_core::{Error, Result};

use crate::Config;

pub mod dummy;
pub mod openai;

pub use tt_core::InferenceModel;

pub const MODEL_NAMES: [&str; 2] = ["openai", "dummy"];

pub fn create_model(name: &str, config: Option<Config>) -> Result<Arc<dyn InferenceModel>> {
    let config = config.unwrap_or_default();
    let model: Arc<dyn InferenceModel> = match name {
        "openai" => Arc::new(openai::OpenAiModel::new(&config)?),
        "dummy" => Arc::new(dummy::DummyModel::new()),
        _ => {
            return Err(Error::Config(format!(
                "Unknown model: {} (expected one of: {})",
                name,
                MODEL_NAMES.join(", ")
            )))
        }
    };
    info!("🤖 Using {} model", model.name());
    Ok(model)
}
