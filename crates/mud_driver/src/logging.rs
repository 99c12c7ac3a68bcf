//! # Log Files
//!
//! The driver writes two logs:
//! - `driver.log` in the driver log directory: everything the driver logs
//! - `game.log` in the game log directory: events logged by game logic
//!   under [`GAME_LOG_TARGET`]
//!
//! This module only prepares the files. Installing the subscriber that
//! writes to them is up to the binary.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult};

/// File name of the driver log.
pub const DRIVER_LOG_FILE: &str = "driver.log";

/// File name of the game log.
pub const GAME_LOG_FILE: &str = "game.log";

/// Tracing target for events that belong in the game log.
pub const GAME_LOG_TARGET: &str = "mud_game";

/// Open log files, ready to be handed to a subscriber.
#[derive(Debug)]
pub struct LogFiles {
    /// The driver log.
    pub driver: File,
    /// The game log.
    pub game: File,
    /// Where the driver log lives.
    pub driver_path: PathBuf,
    /// Where the game log lives.
    pub game_path: PathBuf,
}

impl LogFiles {
    /// Creates the log directories if needed and opens both logs for
    /// appending.
    ///
    /// # Errors
    ///
    /// [`DriverError::LogFile`] if a directory can't be created or a file
    /// can't be opened.
    pub fn open(config: &DriverConfig) -> DriverResult<Self> {
        let driver_path = config.driver_log_dir.join(DRIVER_LOG_FILE);
        let game_path = config.game_log_dir.join(GAME_LOG_FILE);
        Ok(Self {
            driver: open_append(&driver_path)?,
            game: open_append(&game_path)?,
            driver_path,
            game_path,
        })
    }
}

fn open_append(path: &Path) -> DriverResult<File> {
    let log_error = |source| DriverError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(log_error)?;
    }
    OpenOptions::new().create(true).append(true).open(path).map_err(log_error)
}
