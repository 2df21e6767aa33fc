pub mod api;
pub mod notify;
pub mod router;
pub mod server;
pub mod slack;
pub mod state;
pub mod web;

pub use server::GatewayServer;
pub use state::{AppState, SharedState};
