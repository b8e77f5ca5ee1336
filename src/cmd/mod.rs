//! CLI command implementations.
//!
//! | Module      | Commands handled                    |
//! |-------------|-------------------------------------|
//! | `level`     | `Levels`, `Status`, `Note`, `Reset` |
//! | `play`      | `Play`                              |
//! | `character` | `Character`                         |
//! | `config`    | `Config`                            |

pub mod character;
pub mod config;
pub mod level;
pub mod play;

pub use character::cmd_character;
pub use config::cmd_config;
pub use level::{cmd_levels, cmd_note, cmd_reset, cmd_status};
pub use play::cmd_play;

use anyhow::Result;
use std::sync::Arc;

use pmquest::config::Config;
use pmquest::runner::Course;
use pmquest::session::{HostSession, User};
use pmquest::ui::icons::WARN;

/// A course bound to the current user's storage.
pub struct Workspace {
    pub course: Course,
    pub user: Option<User>,
}

impl Workspace {
    pub async fn open(config: &Config) -> Result<Self> {
        let catalog = Arc::new(config.load_catalog()?);
        let mut session = HostSession::new(config.data_dir.clone());
        let storage = session.open_storage(&config.identity()).await;

        if storage.is_guest() {
            println!(
                "{}",
                console::style("Playing as guest: progress is not saved. Set PMQUEST_USER or [user] id to keep it.")
                    .dim()
            );
        } else if storage.is_degraded() {
            eprintln!(
                "{}Storage under {} is unavailable: progress may not be saved this session",
                WARN,
                config.data_dir.display()
            );
        }

        Ok(Self {
            course: Course::new(catalog, storage.backend, config.strict()),
            user: storage.user,
        })
    }
}
