#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

/// 12 hour clock times and form input normalization
pub mod alarm;
pub mod audio;
pub mod communication;
pub mod config;
pub mod error;
pub mod page;
pub mod playback;
pub mod ringtone;
pub mod settings;
pub mod trigger;
pub mod web;
