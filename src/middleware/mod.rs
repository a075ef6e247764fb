// Middleware for CORS and request throttling

pub mod cors;
pub mod rate_limiter;

pub use cors::*;
pub use rate_limiter::*;
