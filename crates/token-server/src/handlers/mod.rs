//! HTTP request handlers for the token server.

pub mod health;
pub mod metrics;
pub mod rooms;
pub mod tokens;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use rooms::list_rooms;
pub use tokens::get_token;
