//! # Memory Management
//!
//! Early warning for running out of memory.
//!
//! A block of memory is set aside at startup. When the process comes under
//! memory pressure the block is given back, and the loss of the block is the
//! signal for the driver to shut down gracefully while it still can.

mod reserve;

pub use reserve::MemoryReserve;
