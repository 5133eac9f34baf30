use serde::{Deserialize, Serialize};

use crate::preferences::{keys, PreferenceStore};

use super::PreferenceHandle;

/// Light, dark, or follow the operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    /// Whether the dark palette applies, given the system preference
    pub fn is_dark(self, system_dark: bool) -> bool {
        match self {
            ThemeMode::Light => false,
            ThemeMode::Dark => true,
            ThemeMode::System => system_dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Light => "Light",
            ThemeMode::Dark => "Dark",
            ThemeMode::System => "System",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    #[default]
    Blue,
    Green,
    Purple,
    Orange,
    Red,
}

impl AccentColor {
    pub const ALL: [AccentColor; 5] = [
        AccentColor::Blue,
        AccentColor::Green,
        AccentColor::Purple,
        AccentColor::Orange,
        AccentColor::Red,
    ];

    pub fn rgb(self) -> [u8; 3] {
        match self {
            AccentColor::Blue => [100, 150, 250],
            AccentColor::Green => [80, 200, 120],
            AccentColor::Purple => [170, 120, 240],
            AccentColor::Orange => [240, 160, 70],
            AccentColor::Red => [230, 80, 80],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccentColor::Blue => "Blue",
            AccentColor::Green => "Green",
            AccentColor::Purple => "Purple",
            AccentColor::Orange => "Orange",
            AccentColor::Red => "Red",
        }
    }
}

/// Persisted under `themePreferences`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemePreferences {
    pub mode: ThemeMode,
    pub accent: AccentColor,
    pub font_scale: f32,
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

impl ThemePreferences {
    pub const MIN_FONT_SCALE: f32 = 0.75;
    pub const MAX_FONT_SCALE: f32 = 1.5;

    /// Typed handle bound to the theme key
    pub fn handle(store: &PreferenceStore) -> PreferenceHandle<Self> {
        PreferenceHandle::new(store.clone(), keys::THEME, Self::default())
    }

    /// Clamp values a hand-edited file may have pushed out of range
    pub fn normalized(mut self) -> Self {
        self.font_scale = if self.font_scale.is_finite() {
            self.font_scale
                .clamp(Self::MIN_FONT_SCALE, Self::MAX_FONT_SCALE)
        } else {
            1.0
        };
        self
    }
}

impl Default for ThemePreferences {
    fn default() -> Self {
        Self {
            mode: ThemeMode::System,
            accent: AccentColor::Blue,
            font_scale: 1.0,
            high_contrast: false,
            reduced_motion: false,
        }
    }
}
