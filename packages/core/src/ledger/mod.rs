//! Material Ledger Module
//!
//! Record types and query filters for the in-memory material ledger.

pub mod filter;
pub mod types;

pub use filter::{MaterialFilter, MaterialQuery};
pub use types::*;
