pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod services;

pub use auth::*;
pub use cache::*;
pub use config::*;
pub use error::*;
