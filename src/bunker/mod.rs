//! Bunker core: pending invoices, per-agent admission and the
//! create / confirm / retrieve orchestration.

pub mod clock;
pub mod invoice;
pub mod rate_window;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::*;
pub use invoice::*;
pub use rate_window::AgentRateLimiter;
pub use service::BunkerService;
