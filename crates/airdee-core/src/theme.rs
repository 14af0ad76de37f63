use crate::error::{AirdeeError, AirdeeResult};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Key under which the selected theme is stored.
pub const THEME_KEY: &str = "airdee-theme";

/// Theme names offered by the settings screen.
pub const THEME_CHOICES: [&str; 3] = ["system", "light", "dark"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Theme {
    /// Follow the terminal or browser default.
    #[default]
    System,
    Named(String),
}

impl Theme {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "" | "system" => Theme::System,
            other => Theme::Named(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Theme::System => "system",
            Theme::Named(name) => name,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted client settings: a small JSON key-value file.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    /// Store under the user's config directory (`airdee/settings.json`).
    pub fn open_default() -> AirdeeResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AirdeeError::Config("Could not determine config directory".to_string()))?;

        Ok(Self::at(config_dir.join("airdee").join("settings.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved theme, or [`Theme::System`] when nothing usable is stored.
    pub fn load(&self) -> Theme {
        match self.read_entries() {
            Ok(entries) => entries
                .get(THEME_KEY)
                .map(|name| Theme::parse(name))
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable settings file");
                Theme::System
            }
        }
    }

    pub fn save(&self, theme: &Theme) -> AirdeeResult<()> {
        // Keep unrelated entries; start over if the file is corrupt.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(THEME_KEY.to_string(), theme.as_str().to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn read_entries(&self) -> AirdeeResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
