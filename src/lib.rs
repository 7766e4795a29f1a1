pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod startup;
pub mod utils;

pub use config::Config;
pub use error::ApiError;
pub use router::{build_app, ResourceRouters};
