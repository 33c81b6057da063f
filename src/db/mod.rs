mod connection;
mod helpers;
mod migrations;
mod sessions;

pub use connection::Database;
