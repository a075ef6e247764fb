// Payment verification against the Solana chain

pub mod oracle;
pub mod solana;
pub mod verifier;

pub use oracle::*;
pub use solana::SolanaRpcClient;
pub use verifier::*;
