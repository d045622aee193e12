pub mod categories;
pub mod cli;
pub mod enhancers;
pub mod images;
pub mod logging;
pub mod manager;
pub mod research;
pub mod search;

#[cfg(test)]
mod testing;

pub use cli::{handle_command, EnhanceCommands, PassArgs};
pub use images::{ImageQuery, ImageResolver};
pub use manager::PipelineManager;

pub mod prelude {
    pub use super::enhancers::{Enhancer, PassOptions, PassReport};
    pub use super::images::{ImageQuery, ImageResolver};
    pub use super::manager::PipelineManager;
    pub use tt_core::{Error, ImageResult, ImageSource, Result};
}
