//! Options-surface navigation.
//!
//! askbridge runs headless; its configuration surface is the config file
//! itself. The navigator points the user at it through the log stream,
//! which is where a daemon operator is already looking.

use std::path::PathBuf;

use askbridge_core::navigate::OptionsNavigator;

/// Navigator that directs the user to the on-disk configuration file.
pub struct ConfigFileNavigator {
    config_path: PathBuf,
}

impl ConfigFileNavigator {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }
}

impl OptionsNavigator for ConfigFileNavigator {
    fn open_options(&self) {
        tracing::info!(
            path = %self.config_path.display(),
            "configure your provider by editing the config file"
        );
    }
}
