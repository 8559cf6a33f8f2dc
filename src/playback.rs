use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info, warn};

use crate::{alarm::AlarmTime, error::PlaybackError};

/// Something that can make noise.
pub trait AudioBackend: fmt::Debug + Send + Sync {
    /// # Errors
    /// when the file can't be opened or decoded, or the device is gone
    fn start_loop(&self, path: &Path) -> Result<(), PlaybackError>;

    fn stop_loop(&self);

    /// Plays `path` once for at most `duration`, returning after it's done.
    ///
    /// # Errors
    /// when the file can't be opened or decoded, or the device is gone
    fn preview(&self, path: &Path, duration: Duration) -> Result<(), PlaybackError>;

    /// whether the loop started by [`AudioBackend::start_loop`] is still audible
    fn is_looping(&self) -> bool;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub is_ringing: bool,
    /// display time (`HH:MM AM/PM`) of the last manual stop
    pub suppressed_until_minute_change: Option<String>,
}

/// what [`PlaybackController::ring_if_armed`] did
#[derive(Debug)]
pub enum Ring {
    Started(PathBuf),
    AlreadyRinging,
    /// stopped by hand during this minute
    Suppressed,
    RingtoneMissing,
    Failed(PlaybackError),
}

/// Owns the audio backend and the ringing/suppression state.
///
/// All state changes happen under one lock, and the lock is held while a
/// ring decision is turned into playback, so a stop from the web page and a
/// trigger from the alarm thread can't interleave.
#[derive(Debug)]
pub struct PlaybackController {
    backend: Option<Box<dyn AudioBackend>>,
    state: Mutex<PlaybackState>,
}

impl PlaybackController {
    /// `None` puts the controller in degraded mode, where every attempt to
    /// play reports [`PlaybackError::DeviceUnavailable`].
    #[must_use]
    pub fn new(backend: Option<Box<dyn AudioBackend>>) -> Self {
        Self {
            backend,
            state: Mutex::new(PlaybackState::default()),
        }
    }

    #[must_use]
    pub const fn device_available(&self) -> bool {
        self.backend.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_ringing(&self) -> bool {
        self.lock().is_ringing
    }

    #[must_use]
    pub fn suppressed_until(&self) -> Option<String> {
        self.lock().suppressed_until_minute_change.clone()
    }

    pub fn clear_suppression(&self) {
        self.lock().suppressed_until_minute_change = None;
    }

    /// Starts looping `path`.
    ///
    /// # Errors
    /// when playback can't start; the controller is left not ringing
    pub fn start_loop(&self, path: &Path) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        self.start_locked(&mut state, path)
    }

    fn start_locked(&self, state: &mut PlaybackState, path: &Path) -> Result<(), PlaybackError> {
        let Some(backend) = &self.backend else {
            state.is_ringing = false;
            return Err(PlaybackError::DeviceUnavailable);
        };
        match backend.start_loop(path) {
            Ok(()) => {
                state.is_ringing = true;
                info!("ringing (looping) {}", path.display());
                Ok(())
            }
            Err(e) => {
                state.is_ringing = false;
                warn!("failed to play {}: {e}", path.display());
                Err(e)
            }
        }
    }

    /// Stops the alarm and keeps it quiet for the rest of the current minute.
    pub fn stop(&self) {
        self.stop_at(&AlarmTime::now());
    }

    pub fn stop_at(&self, now: &AlarmTime) {
        let mut state = self.lock();
        if let Some(backend) = &self.backend {
            backend.stop_loop();
        }
        state.is_ringing = false;
        state.suppressed_until_minute_change = Some(now.display());
        info!("alarm stopped for {now}");
    }

    /// Plays `path` once for at most `duration`, blocking until it's done.
    ///
    /// Leaves the ringing and suppression state alone.
    ///
    /// # Errors
    /// when the device is unavailable or the file can't be played
    pub fn play_preview(&self, path: &Path, duration: Duration) -> Result<(), PlaybackError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(PlaybackError::DeviceUnavailable)?;
        backend.preview(path, duration)
    }

    /// Starts the alarm unless it's already ringing or was stopped by hand.
    ///
    /// A recorded stop keeps the alarm quiet until [`Self::clear_suppression`]
    /// is called when the minute rolls over. That includes a stop recorded for
    /// a later minute than `now`, which happens when `/stop` lands between the
    /// caller reading the clock and taking the lock.
    ///
    /// `resolve` is only asked for the ringtone once the alarm is actually
    /// going to ring.
    pub fn ring_if_armed(&self, now: &AlarmTime, resolve: impl FnOnce() -> Option<PathBuf>) -> Ring {
        let mut state = self.lock();
        if state.is_ringing && !self.backend.as_ref().is_some_and(|b| b.is_looping()) {
            warn!("playback ended on its own");
            state.is_ringing = false;
        }

        if state.is_ringing {
            return Ring::AlreadyRinging;
        }
        if let Some(until) = &state.suppressed_until_minute_change {
            debug!("not ringing at {now}, stopped at {until}");
            return Ring::Suppressed;
        }
        let Some(path) = resolve() else {
            return Ring::RingtoneMissing;
        };
        match self.start_locked(&mut state, &path) {
            Ok(()) => Ring::Started(path),
            Err(e) => Ring::Failed(e),
        }
    }
}
