//! Service layer
//! Business logic over the pool and the upstream seams; no HTTP types here.

pub mod auth;
pub mod credits;
pub mod currency;
pub mod generation;
pub mod payments;

pub use auth::AuthService;
pub use credits::CreditLedger;
pub use currency::CurrencyService;
pub use generation::GenerationService;
pub use payments::PaymentService;
