//! HTTP surface: routing, handlers and boundary error mapping.

pub mod allocations;
pub mod assets;
pub mod clients;
pub mod error;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::create_router;
pub use state::AppState;
