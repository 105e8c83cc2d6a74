// SPF Command Gate - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Router configuration: user-visible message texts. JSON on disk,
// compiled defaults when no file is present.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub version: String,
    #[serde(default)]
    pub messages: Messages,
}

/// Texts sent to senders. `{max}` and `{commands}` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub not_found: String,
    pub forbidden: String,
    pub handler_error: String,
    pub too_many_args: String,
    pub provide_command: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            not_found: "Command not found".to_string(),
            forbidden: "You don't have permission to use this command.".to_string(),
            handler_error: "An error occurred while executing the command.".to_string(),
            too_many_args: "Too many arguments. Maximum: {max}".to_string(),
            provide_command: "Please provide a command: {commands}".to_string(),
        }
    }
}

impl Messages {
    pub fn too_many_args(&self, max: usize) -> String {
        self.too_many_args.replace("{max}", &max.to_string())
    }

    pub fn provide_command(&self, commands: &[String]) -> String {
        self.provide_command.replace("{commands}", &format!("[{}]", commands.join(", ")))
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            messages: Messages::default(),
        }
    }
}

impl RouterConfig {
    /// Load config from JSON file, falling back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read router config {:?}", path))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Invalid router config JSON in {:?}", path))?;
            log::debug!("Loaded router config {} from {:?}", config.version, path);
            Ok(config)
        } else {
            log::warn!("Config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save config to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write router config {:?}", path))?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
