use crate::error::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_FONT_SIZE_PX: u32 = 16;
pub const DEFAULT_LETTER_SPACING_EM: f64 = 0.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 1.5;

/// Keys of the flat persisted layout.
pub mod keys {
    pub const CURRENT_MODE: &str = "currentMode";
    pub const CURRENT_THEME: &str = "currentTheme";
    pub const FONT_SIZE: &str = "fontSize";
    pub const DYSLEXIA_FONT: &str = "dyslexiaFont";
    pub const LETTER_SPACING: &str = "letterSpacing";
    pub const LINE_HEIGHT: &str = "lineHeight";
    pub const EXTENSION_ENABLED: &str = "extensionEnabled";

    pub const ALL: [&str; 7] = [
        CURRENT_MODE,
        CURRENT_THEME,
        FONT_SIZE,
        DYSLEXIA_FONT,
        LETTER_SPACING,
        LINE_HEIGHT,
        EXTENSION_ENABLED,
    ];
}

/// Colour scheme applied to the page. Unknown names resolve to `Default`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    BlueYellow,
    YellowBlue,
    Gray,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Default,
        Theme::Dark,
        Theme::BlueYellow,
        Theme::YellowBlue,
        Theme::Gray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Dark => "dark",
            Theme::BlueYellow => "blue-yellow",
            Theme::YellowBlue => "yellow-blue",
            Theme::Gray => "gray",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "dark" => Theme::Dark,
            "blue-yellow" => Theme::BlueYellow,
            "yellow-blue" => Theme::YellowBlue,
            "gray" => Theme::Gray,
            _ => Theme::Default,
        }
    }
}

impl From<String> for Theme {
    fn from(value: String) -> Self {
        Theme::from_name(&value)
    }
}

impl Serialize for Theme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual adjustments realized by the style injector.
///
/// Every field defaults, so a partial JSON object always deserializes into
/// something renderable. Nulls and legacy numeric strings are read the same
/// way [`Preferences`] reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessibilitySettings {
    #[serde(deserialize_with = "lenient_theme")]
    pub theme: Theme,
    #[serde(deserialize_with = "lenient_font_size")]
    pub font_size: u32,
    #[serde(deserialize_with = "lenient_letter_spacing")]
    pub letter_spacing: f64,
    #[serde(deserialize_with = "lenient_line_height")]
    pub line_height: f64,
    #[serde(deserialize_with = "lenient_flag")]
    pub dyslexia_font: bool,
}

impl Default for AccessibilitySettings {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            font_size: DEFAULT_FONT_SIZE_PX,
            letter_spacing: DEFAULT_LETTER_SPACING_EM,
            line_height: DEFAULT_LINE_HEIGHT,
            dyslexia_font: false,
        }
    }
}

impl AccessibilitySettings {
    /// Replaces out-of-range values with their defaults.
    pub fn normalized(&self) -> Self {
        let font_size = if self.font_size == 0 {
            DEFAULT_FONT_SIZE_PX
        } else {
            self.font_size
        };
        let letter_spacing = if self.letter_spacing.is_finite() && self.letter_spacing >= 0.0 {
            self.letter_spacing
        } else {
            DEFAULT_LETTER_SPACING_EM
        };
        let line_height = if self.line_height.is_finite() && self.line_height > 0.0 {
            self.line_height
        } else {
            DEFAULT_LINE_HEIGHT
        };
        Self {
            theme: self.theme,
            font_size,
            letter_spacing,
            line_height,
            dyslexia_font: self.dyslexia_font,
        }
    }
}

/// How AI output is laid out in the popup.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Visual,
    Reading,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Visual => "visual",
            DisplayMode::Reading => "reading",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "visual" => Some(DisplayMode::Visual),
            "reading" => Some(DisplayMode::Reading),
            _ => None,
        }
    }

    pub fn body_class(&self) -> String {
        format!("{}-mode", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ExtensionState {
    pub current_mode: DisplayMode,
    pub extension_enabled: bool,
}

impl Default for ExtensionState {
    fn default() -> Self {
        Self {
            current_mode: DisplayMode::Visual,
            extension_enabled: true,
        }
    }
}

/// Typed view of whatever subset of the persisted keys is present.
///
/// Values written by older popups were strings (`"18"`, `"0.1"`), so numeric
/// fields accept either representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub current_mode: Option<DisplayMode>,
    pub theme: Option<Theme>,
    pub font_size: Option<u32>,
    pub dyslexia_font: Option<bool>,
    pub letter_spacing: Option<f64>,
    pub line_height: Option<f64>,
    pub extension_enabled: Option<bool>,
}

impl Preferences {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            current_mode: map
                .get(keys::CURRENT_MODE)
                .and_then(Value::as_str)
                .and_then(DisplayMode::from_name),
            theme: map.get(keys::CURRENT_THEME).and_then(theme_like),
            font_size: map.get(keys::FONT_SIZE).and_then(font_size_like),
            dyslexia_font: map.get(keys::DYSLEXIA_FONT).and_then(Value::as_bool),
            letter_spacing: map.get(keys::LETTER_SPACING).and_then(number_like),
            line_height: map
                .get(keys::LINE_HEIGHT)
                .and_then(number_like)
                .filter(|value| *value > 0.0),
            extension_enabled: map.get(keys::EXTENSION_ENABLED).and_then(Value::as_bool),
        }
    }

    /// Overlays the stored values on the built-in defaults.
    pub fn settings(&self) -> AccessibilitySettings {
        let defaults = AccessibilitySettings::default();
        AccessibilitySettings {
            theme: self.theme.unwrap_or(defaults.theme),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            letter_spacing: self.letter_spacing.unwrap_or(defaults.letter_spacing),
            line_height: self.line_height.unwrap_or(defaults.line_height),
            dyslexia_font: self.dyslexia_font.unwrap_or(defaults.dyslexia_font),
        }
        .normalized()
    }

    pub fn state(&self) -> ExtensionState {
        ExtensionState {
            current_mode: self.current_mode.unwrap_or_default(),
            extension_enabled: self.extension_enabled.unwrap_or(true),
        }
    }
}

/// Entries written when the user presses "Apply".
pub fn settings_entries(settings: &AccessibilitySettings) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(keys::CURRENT_THEME.into(), Value::from(settings.theme.as_str()));
    map.insert(keys::FONT_SIZE.into(), Value::from(settings.font_size));
    map.insert(keys::DYSLEXIA_FONT.into(), Value::from(settings.dyslexia_font));
    map.insert(keys::LETTER_SPACING.into(), Value::from(settings.letter_spacing));
    map.insert(keys::LINE_HEIGHT.into(), Value::from(settings.line_height));
    map
}

pub fn single_entry(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value.into());
    map
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite())
}

fn theme_like(value: &Value) -> Option<Theme> {
    value
        .as_str()
        .filter(|name| !name.is_empty())
        .map(Theme::from_name)
}

fn font_size_like(value: &Value) -> Option<u32> {
    number_like(value)
        .filter(|size| *size > 0.0)
        .map(|size| size.round() as u32)
}

fn lenient_theme<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Theme, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(theme_like(&value).unwrap_or_default())
}

fn lenient_font_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(font_size_like(&value).unwrap_or(DEFAULT_FONT_SIZE_PX))
}

fn lenient_letter_spacing<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_like(&value).unwrap_or(DEFAULT_LETTER_SPACING_EM))
}

fn lenient_line_height<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_like(&value).unwrap_or(DEFAULT_LINE_HEIGHT))
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Key/value area the popup persists preferences into.
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Returns the stored values for whichever of `keys` are present.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError>;

    /// Merges `entries` into the stored values.
    async fn set(&self, entries: Map<String, Value>) -> Result<(), StorageError>;
}

/// Settings storage, either in memory only or mirrored to a JSON file.
#[derive(Clone)]
pub struct SyncStorage {
    shared: Arc<StorageShared>,
}

struct StorageShared {
    values: RwLock<Map<String, Value>>,
    path: Option<PathBuf>,
}

impl SyncStorage {
    /// Opens a file-backed store, loading any values already on disk.
    pub fn persistent(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Map::new()
        };
        Ok(Self::with_values(values, Some(path)))
    }

    pub fn ephemeral() -> Self {
        Self::with_values(Map::new(), None)
    }

    fn with_values(values: Map<String, Value>, path: Option<PathBuf>) -> Self {
        Self {
            shared: Arc::new(StorageShared {
                values: RwLock::new(values),
                path,
            }),
        }
    }

    fn write_snapshot(&self, snapshot: &Map<String, Value>) -> Result<(), StorageError> {
        let Some(path) = &self.shared.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl StorageArea for SyncStorage {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StorageError> {
        let guard = self.shared.values.read();
        Ok(keys
            .iter()
            .filter_map(|key| guard.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<(), StorageError> {
        let mut guard = self.shared.values.write();
        for (key, value) in entries {
            debug!(%key, "storing preference");
            guard.insert(key, value);
        }
        let snapshot = guard.clone();
        drop(guard);
        self.write_snapshot(&snapshot)
    }
}
