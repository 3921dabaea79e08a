pub mod error;
mod routes;
pub mod state;

pub use routes::{app, router};
pub use state::AppState;
