pub mod auth;
pub mod cors;

pub use auth::{AuthMiddleware, current_identity};
pub use cors::create_cors;
