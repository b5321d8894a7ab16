pub mod error;
pub mod homeserver;
pub mod routes;
pub mod shortcuts;
pub mod state;
