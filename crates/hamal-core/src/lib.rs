pub mod config;
pub mod types;

pub use config::HamalConfig;
pub use types::*;
