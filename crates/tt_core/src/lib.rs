pub mod affiliate;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod types;

pub use error::Error;
pub use config::Config;
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use models::{CompletionRequest, InferenceModel};
pub use types::*;

pub type Result<T> = std::result::Result<T, Error>;
