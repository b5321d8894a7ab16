pub mod api;
pub mod metadata;
pub mod server_name;
