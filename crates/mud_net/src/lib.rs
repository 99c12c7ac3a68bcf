//! # MUD Net - Sessions
//!
//! The game loop's view of the network: which connections exist, what state
//! they are in, and which one to serve next.
//!
//! ## Architecture
//!
//! ```text
//!   I/O collaborator                      Game loop
//!   ────────────────                      ─────────
//!   accept()   ──► ConnectionTable ◄──── next_ready()
//!   deliver()  ──► Session               has_ready_work()
//!   signal()   ──► DriverSignals ◄────── wait_for_wake()
//! ```
//!
//! Reading and writing bytes is the I/O collaborator's job. This crate only
//! tracks the state needed for fair polling and for the session lifecycle.

#![deny(unsafe_code)]

pub mod connection_table;
pub mod session;

pub use connection_table::ConnectionTable;
pub use session::{Session, SessionState};

// Sessions are identified by the core's id type.
pub use mud_core::SessionId;
