//! # Game Loop Signaling
//!
//! ```text
//! Thread 1 (Game loop):   runs ticks, sleeps when there is no work
//! Thread 2 (Heartbeat):   raises the tick flag once per interval
//! I/O collaborators:      wake the loop when input arrives
//! ```
//!
//! All of them meet at one mutex. There is no second lock, so there is no
//! lock order to get wrong.

mod signals;

pub use signals::DriverSignals;
