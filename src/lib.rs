pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod core;
pub mod error;
pub mod ratelimit;
pub mod scheduler;
pub mod state;
pub mod upstream;
