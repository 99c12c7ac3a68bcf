//! # MUD Driver
//!
//! The game loop that ties the kernel together:
//! - [`GameLoop`] runs one tick at a time until shutdown
//! - [`HeartbeatTimer`] marks periodic housekeeping as due
//! - [`DriverHooks`] is where game logic plugs in
//! - [`DriverConfig`] holds the settings read at startup
//! - [`LogFiles`] are the driver and game logs on disk
//!
//! ## Example
//!
//! ```rust
//! use mud_driver::{DriverRuntime, GameLoop, GuestHooks};
//!
//! let runtime = DriverRuntime::default();
//! let session = runtime.connections.accept();
//!
//! let mut game = GameLoop::new(runtime.clone(), GuestHooks::new());
//! game.tick();
//! assert!(session.object().is_some());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod console;
pub mod error;
pub mod game_loop;
pub mod logging;
pub mod runtime;

pub use config::{ConfigFile, ConfigOverrides, DriverConfig};
pub use error::{DriverError, DriverResult};
pub use game_loop::{
    DriverContext, DriverHooks, GameLoop, GuestHooks, HeartbeatTimer, LoopState, LoopStats,
};
pub use logging::{LogFiles, GAME_LOG_TARGET};
pub use runtime::DriverRuntime;
