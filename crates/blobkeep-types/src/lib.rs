//! Foundation types for blobkeep.
//!
//! This crate provides the identity, temporal, and settings types shared by
//! every other blobkeep crate.
//!
//! # Key Types
//!
//! - [`AssetKind`]: The three asset families: image, sound, background
//! - [`AssetId`]: `{kind}_{epochMillis}_{suffix}` record identifier
//! - [`Timestamp`]: Milliseconds since the UNIX epoch
//! - [`Clock`]: Source of "now" ([`SystemClock`], [`ManualClock`])
//! - [`Settings`]: The fixed application settings schema
//! - [`SettingsPatch`] / [`SettingChange`]: Typed partial updates

pub mod asset;
pub mod error;
pub mod settings;
pub mod temporal;

pub use asset::{AssetId, AssetKind, ID_SUFFIX_LEN};
pub use error::TypeError;
pub use settings::{AssetSlot, PrayerSound, SettingChange, Settings, SettingsPatch, Theme, Volume};
pub use temporal::{Clock, ManualClock, SharedClock, SystemClock, Timestamp, MILLIS_PER_DAY};
