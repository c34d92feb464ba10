//! Persisted light/dark theme preference.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{StorageBudget, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

/// The theme preference over the store.
pub struct ThemePreference {
    budget: Arc<StorageBudget>,
}

impl ThemePreference {
    pub fn new(budget: Arc<StorageBudget>) -> Self {
        Self { budget }
    }

    /// Current theme. Unset or unknown values become dark, which is then persisted.
    pub fn load(&self) -> Theme {
        match self.budget.read(THEME_KEY).map(|raw| raw.parse::<Theme>()) {
            Some(Ok(theme)) => theme,
            other => {
                if let Some(Err(e)) = other {
                    debug!("Resetting theme: {}", e);
                }
                self.set(Theme::Dark);
                Theme::Dark
            }
        }
    }

    pub fn set(&self, theme: Theme) {
        self.budget.write(THEME_KEY, theme.as_str());
    }

    /// Flip and persist, returning the new theme.
    pub fn toggle(&self) -> Theme {
        let theme = self.load().toggled();
        self.set(theme);
        theme
    }
}
