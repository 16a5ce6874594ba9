pub mod api;
pub mod metrics;
pub mod state;
pub mod tools;

pub use api::create_router;
pub use state::AppState;
