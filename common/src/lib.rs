pub mod config;
pub mod context;
pub mod error;
pub mod games;
pub mod id_generator;
pub mod identifiers;
pub mod logger;
pub mod scheduler;
pub mod store;

pub use error::ApiError;
pub use identifiers::*;
