//! Block-management core: ledger, placement strategies, engine and
//! fragmentation accounting.

pub mod block;
pub mod engine;
pub mod error;
pub mod fragmentation;
pub mod ledger;
pub mod strategy;

pub use engine::Allocator;
