use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{alarm::AlarmTime, error::SettingsError};

/// The one saved alarm, stored as a flat JSON object.
///
/// Every field is kept as the string that was written so a hand edited file
/// still loads; [`AlarmRecord::is_complete`] decides whether it's usable.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AlarmRecord {
    #[serde(default)]
    pub hour: String,
    #[serde(default)]
    pub minute: String,
    #[serde(default)]
    pub ampm: String,
    #[serde(default)]
    pub time12: String,
    #[serde(default)]
    pub ringtone: PathBuf,
}

impl AlarmRecord {
    #[must_use]
    pub fn new(time: AlarmTime, ringtone: PathBuf) -> Self {
        Self {
            hour: time.hour_str(),
            minute: time.minute_str(),
            ampm: time.time_of_day().to_string(),
            time12: time.display(),
            ringtone,
        }
    }

    /// an alarm is only armed when all of hour, minute, am/pm and ringtone are set
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.hour.is_empty()
            && !self.minute.is_empty()
            && !self.ampm.is_empty()
            && !self.ringtone.as_os_str().is_empty()
    }

    /// should the alarm ring at `now`
    #[must_use]
    pub fn matches(&self, now: &AlarmTime) -> bool {
        self.hour == now.hour_str()
            && self.minute == now.minute_str()
            && self.ampm.eq_ignore_ascii_case(now.time_of_day().as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the saved alarm.
    ///
    /// Never fails: a missing, unreadable, corrupt or incomplete file all mean
    /// "no alarm configured".
    #[must_use]
    pub fn load(&self) -> Option<AlarmRecord> {
        self.load_partial().filter(AlarmRecord::is_complete)
    }

    /// Reads whatever the settings file holds, complete or not.
    #[must_use]
    pub fn load_partial(&self) -> Option<AlarmRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("no alarm loaded from {}: {e}", self.path.display());
                return None;
            }
        };
        serde_json::from_str::<AlarmRecord>(&contents)
            .map_err(|e| warn!("ignoring corrupt settings file {}: {e}", self.path.display()))
            .ok()
    }

    /// Replaces the saved alarm with `record`.
    ///
    /// The record is written to a sibling file first and then renamed into
    /// place, so readers see either the old or the new alarm.
    ///
    /// # Errors
    /// when the settings directory or file can't be written
    pub fn save(&self, record: &AlarmRecord) -> Result<(), SettingsError> {
        let contents = serde_json::to_string_pretty(record)?;
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}
