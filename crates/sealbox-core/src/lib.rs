pub mod b64;
pub mod config;
pub mod error;

pub use config::SealboxConfig;
pub use error::{SealboxError, SealboxResult};
