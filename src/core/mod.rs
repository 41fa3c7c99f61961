//! Core domain
//! Storage, models, services and the sign/deck tables.

pub mod db;
pub mod models;
pub mod services;
pub mod tarot;
pub mod traits;
pub mod zodiac;

pub use traits::{PaymentGateway, RateSource, TextGenerator};
