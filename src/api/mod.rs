pub mod handlers;
pub mod openapi;
pub mod responses;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
