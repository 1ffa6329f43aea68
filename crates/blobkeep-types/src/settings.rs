//! The application settings schema.
//!
//! Settings are a single record with a fixed set of fields. Partial updates
//! are expressed either as a [`SettingChange`] (one field) or a
//! [`SettingsPatch`] (any subset of fields); applying a patch overwrites only
//! the fields it carries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, AssetKind};
use crate::error::TypeError;
use crate::temporal::Timestamp;

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// Colour scheme of the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dark => f.write_str("dark"),
            Self::Light => f.write_str("light"),
        }
    }
}

impl FromStr for Theme {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(TypeError::UnknownTheme(other.to_string())),
        }
    }
}

/// Playback volume in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Volume(f64);

impl Volume {
    pub fn new(level: f64) -> Result<Self, TypeError> {
        if level.is_finite() && (0.0..=1.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(TypeError::InvalidVolume(level))
        }
    }

    pub fn level(&self) -> f64 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(0.8)
    }
}

impl TryFrom<f64> for Volume {
    type Error = TypeError;

    fn try_from(level: f64) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Volume> for f64 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A custom call-to-prayer sound bound to one prayer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerSound {
    pub sound_id: AssetId,
    pub uploaded_at: Timestamp,
    pub file_name: String,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The persisted application settings.
///
/// Asset references are plain ids. Deleting an asset does not touch these
/// fields, so readers must treat a reference to a missing asset as absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub language: String,
    pub volume: Volume,
    pub notifications: bool,
    /// Minutes before the native lock screen engages.
    pub lock_screen_minutes: u32,
    /// Whether the native lock-screen service is enabled.
    pub service_active: bool,
    pub current_background: Option<AssetId>,
    pub last_background_update: Option<Timestamp>,
    pub device_image: Option<AssetId>,
    pub device_image_name: Option<String>,
    pub alert_sound: Option<AssetId>,
    pub prayer_sounds: BTreeMap<String, PrayerSound>,
    pub last_saved: Option<Timestamp>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            language: "ar".into(),
            volume: Volume::default(),
            notifications: true,
            lock_screen_minutes: 5,
            service_active: false,
            current_background: None,
            last_background_update: None,
            device_image: None,
            device_image_name: None,
            alert_sound: None,
            prayer_sounds: BTreeMap::new(),
            last_saved: None,
        }
    }
}

impl Settings {
    /// Overwrite the fields carried by `patch`; leave the rest untouched.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(volume) = patch.volume {
            self.volume = volume;
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        if let Some(minutes) = patch.lock_screen_minutes {
            self.lock_screen_minutes = minutes;
        }
        if let Some(active) = patch.service_active {
            self.service_active = active;
        }
        if let Some(background) = &patch.current_background {
            self.current_background = background.clone();
        }
        if let Some(at) = patch.last_background_update {
            self.last_background_update = Some(at);
        }
        if let Some(image) = &patch.device_image {
            self.device_image = image.clone();
        }
        if let Some(name) = &patch.device_image_name {
            self.device_image_name = name.clone();
        }
        if let Some(sound) = &patch.alert_sound {
            self.alert_sound = sound.clone();
        }
        for (prayer, sound) in &patch.prayer_sounds {
            match sound {
                Some(sound) => {
                    self.prayer_sounds.insert(prayer.clone(), sound.clone());
                }
                None => {
                    self.prayer_sounds.remove(prayer);
                }
            }
        }
    }

    /// Every asset id referenced by these settings, with the slot holding it.
    pub fn asset_references(&self) -> Vec<(AssetSlot, AssetId)> {
        let mut refs = Vec::new();
        if let Some(id) = &self.current_background {
            refs.push((AssetSlot::CurrentBackground, id.clone()));
        }
        if let Some(id) = &self.device_image {
            refs.push((AssetSlot::DeviceImage, id.clone()));
        }
        if let Some(id) = &self.alert_sound {
            refs.push((AssetSlot::AlertSound, id.clone()));
        }
        for (prayer, sound) in &self.prayer_sounds {
            refs.push((AssetSlot::PrayerSound(prayer.clone()), sound.sound_id.clone()));
        }
        refs
    }
}

/// A settings field that holds an asset reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSlot {
    CurrentBackground,
    DeviceImage,
    AlertSound,
    PrayerSound(String),
}

impl AssetSlot {
    /// The collection the referenced asset lives in.
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::CurrentBackground => AssetKind::Background,
            Self::DeviceImage => AssetKind::Image,
            Self::AlertSound | Self::PrayerSound(_) => AssetKind::Sound,
        }
    }
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentBackground => f.write_str("current_background"),
            Self::DeviceImage => f.write_str("device_image"),
            Self::AlertSound => f.write_str("alert_sound"),
            Self::PrayerSound(prayer) => write!(f, "prayer_sounds.{prayer}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

/// A single-field settings update.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingChange {
    Theme(Theme),
    Language(String),
    Volume(Volume),
    Notifications(bool),
    LockScreenMinutes(u32),
    ServiceActive(bool),
    CurrentBackground(Option<AssetId>),
    LastBackgroundUpdate(Timestamp),
    /// Clearing the id clears the name too; a `None` name with an id keeps
    /// whatever name is already stored.
    DeviceImage {
        id: Option<AssetId>,
        name: Option<String>,
    },
    AlertSound(Option<AssetId>),
    PrayerSound {
        prayer: String,
        sound: Option<PrayerSound>,
    },
}

impl SettingChange {
    /// Names accepted by [`SettingChange::parse`].
    pub const FIELDS: [&'static str; 9] = [
        "theme",
        "language",
        "volume",
        "notifications",
        "lock_screen_minutes",
        "service_active",
        "current_background",
        "device_image",
        "alert_sound",
    ];

    /// Build a change from a textual field name and value.
    ///
    /// Reference fields accept `none` (or an empty string) to clear them.
    pub fn parse(field: &str, value: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        let reference = |value: &str| -> Result<Option<AssetId>, TypeError> {
            let value = value.trim();
            if value.is_empty() || value.eq_ignore_ascii_case("none") {
                Ok(None)
            } else {
                AssetId::parse(value).map(Some)
            }
        };
        match field {
            "theme" => Ok(Self::Theme(value.parse()?)),
            "language" => {
                if value.trim().is_empty() {
                    return Err(invalid("must not be empty"));
                }
                Ok(Self::Language(value.trim().to_string()))
            }
            "volume" => {
                let level: f64 = value.trim().parse().map_err(|_| invalid("not a number"))?;
                Ok(Self::Volume(Volume::new(level)?))
            }
            "notifications" => Ok(Self::Notifications(parse_bool(value).ok_or_else(|| invalid("expected true or false"))?)),
            "lock_screen_minutes" => Ok(Self::LockScreenMinutes(
                value.trim().parse().map_err(|_| invalid("expected whole minutes"))?,
            )),
            "service_active" => Ok(Self::ServiceActive(parse_bool(value).ok_or_else(|| invalid("expected true or false"))?)),
            "current_background" => Ok(Self::CurrentBackground(reference(value)?)),
            "device_image" => Ok(Self::DeviceImage {
                id: reference(value)?,
                name: None,
            }),
            "alert_sound" => Ok(Self::AlertSound(reference(value)?)),
            other => Err(TypeError::UnknownSetting(other.to_string())),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// A partial settings update: `None` fields are left alone.
///
/// Reference fields use a nested `Option` so a patch can distinguish
/// "leave as is" (`None`) from "clear" (`Some(None)`). Prayer sounds are
/// merged per prayer; a `None` entry removes that prayer's sound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub volume: Option<Volume>,
    pub notifications: Option<bool>,
    pub lock_screen_minutes: Option<u32>,
    pub service_active: Option<bool>,
    pub current_background: Option<Option<AssetId>>,
    pub last_background_update: Option<Timestamp>,
    pub device_image: Option<Option<AssetId>>,
    pub device_image_name: Option<Option<String>>,
    pub alert_sound: Option<Option<AssetId>>,
    pub prayer_sounds: BTreeMap<String, Option<PrayerSound>>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the patch carries no fields.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Record a change; a later change to the same field replaces an earlier one.
    pub fn record(&mut self, change: SettingChange) {
        match change {
            SettingChange::Theme(theme) => self.theme = Some(theme),
            SettingChange::Language(language) => self.language = Some(language),
            SettingChange::Volume(volume) => self.volume = Some(volume),
            SettingChange::Notifications(on) => self.notifications = Some(on),
            SettingChange::LockScreenMinutes(minutes) => self.lock_screen_minutes = Some(minutes),
            SettingChange::ServiceActive(active) => self.service_active = Some(active),
            SettingChange::CurrentBackground(id) => self.current_background = Some(id),
            SettingChange::LastBackgroundUpdate(at) => self.last_background_update = Some(at),
            SettingChange::DeviceImage { id, name } => {
                if id.is_none() {
                    self.device_image_name = Some(None);
                } else if let Some(name) = name {
                    self.device_image_name = Some(Some(name));
                }
                self.device_image = Some(id);
            }
            SettingChange::AlertSound(id) => self.alert_sound = Some(id),
            SettingChange::PrayerSound { prayer, sound } => {
                self.prayer_sounds.insert(prayer, sound);
            }
        }
    }

    /// Builder-style [`SettingsPatch::record`].
    pub fn with(mut self, change: SettingChange) -> Self {
        self.record(change);
        self
    }

    /// Clear whatever reference `slot` holds.
    pub fn detach(&mut self, slot: &AssetSlot) {
        match slot {
            AssetSlot::CurrentBackground => self.current_background = Some(None),
            AssetSlot::DeviceImage => {
                self.device_image = Some(None);
                self.device_image_name = Some(None);
            }
            AssetSlot::AlertSound => self.alert_sound = Some(None),
            AssetSlot::PrayerSound(prayer) => {
                self.prayer_sounds.insert(prayer.clone(), None);
            }
        }
    }

    /// Fill every field this patch leaves unset from `older`.
    ///
    /// Used to put a failed batch back underneath changes recorded since:
    /// fields present in `self` are newer and win.
    pub fn absorb_older(&mut self, older: SettingsPatch) {
        fn keep_newer<T>(newer: &mut Option<T>, older: Option<T>) {
            if newer.is_none() {
                *newer = older;
            }
        }
        keep_newer(&mut self.theme, older.theme);
        keep_newer(&mut self.language, older.language);
        keep_newer(&mut self.volume, older.volume);
        keep_newer(&mut self.notifications, older.notifications);
        keep_newer(&mut self.lock_screen_minutes, older.lock_screen_minutes);
        keep_newer(&mut self.service_active, older.service_active);
        keep_newer(&mut self.current_background, older.current_background);
        keep_newer(&mut self.last_background_update, older.last_background_update);
        keep_newer(&mut self.device_image, older.device_image);
        keep_newer(&mut self.device_image_name, older.device_image_name);
        keep_newer(&mut self.alert_sound, older.alert_sound);
        for (prayer, sound) in older.prayer_sounds {
            self.prayer_sounds.entry(prayer).or_insert(sound);
        }
    }
}

impl From<SettingChange> for SettingsPatch {
    fn from(change: SettingChange) -> Self {
        Self::new().with(change)
    }
}
