//! Cross-cutting concerns: configuration, logging and the domain model.

pub mod config;
pub mod log;
pub mod model;

pub use config::AppConfig;
pub use model::{Allocation, Asset, Client, ClientStatus};
