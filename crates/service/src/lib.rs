//! Service support library: logging bootstrap, shared state and the HTTP
//! surface.

pub mod dispatcher;
pub mod http;
mod logging;
pub mod state;
pub mod status;

pub use http::build_router;
pub use logging::init_tracing_with_config;
pub use state::AppState;
