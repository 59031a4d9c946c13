pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
