pub mod auth;
pub mod credentials;
pub mod error;
pub mod hello;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod tokens;
pub mod validation;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;
