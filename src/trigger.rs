use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use chrono::Timelike;
use log::{error, info};

use crate::{
    alarm::AlarmTime,
    playback::{PlaybackController, Ring},
    ringtone::RingtoneResolver,
    settings::SettingsStore,
};

const ERROR_BACKOFF: Duration = Duration::from_secs(2);
const STATUS_INTERVAL: Duration = Duration::from_secs(12);

/// what a single check of the alarm did
#[derive(Debug)]
pub enum Tick {
    /// no complete alarm saved
    Unconfigured,
    /// alarm saved but it isn't time yet
    Waiting,
    Ring(Ring),
}

/// Checks the saved alarm against the wall clock once a second.
///
/// The alarm is re-read from disk on every tick rather than scheduled ahead
/// of time, so edits to the settings file, clock changes and restarts are
/// all picked up within a second.
#[derive(Debug)]
pub struct TriggerLoop {
    store: SettingsStore,
    resolver: RingtoneResolver,
    controller: Arc<PlaybackController>,
    last_minute_key: Option<String>,
    last_status: Option<Instant>,
}

impl TriggerLoop {
    #[must_use]
    pub const fn new(
        store: SettingsStore,
        resolver: RingtoneResolver,
        controller: Arc<PlaybackController>,
    ) -> Self {
        Self {
            store,
            resolver,
            controller,
            last_minute_key: None,
            last_status: None,
        }
    }

    /// Runs one check as if the wall clock read `now`.
    pub fn tick(&mut self, now: &AlarmTime) -> Tick {
        let Some(alarm) = self.store.load() else {
            return Tick::Unconfigured;
        };

        // a new minute re-arms an alarm that was stopped by hand
        let minute_key = now.minute_key();
        if self.last_minute_key.as_ref() != Some(&minute_key) {
            self.controller.clear_suppression();
            self.last_minute_key = Some(minute_key);
        }

        if self.status_due() {
            info!(
                "now={now} target={} ringing={}",
                alarm.time12,
                self.controller.is_ringing()
            );
        }

        if !alarm.matches(now) {
            return Tick::Waiting;
        }
        let ring = self
            .controller
            .ring_if_armed(now, || self.resolver.resolve(&alarm.ringtone));
        match &ring {
            Ring::RingtoneMissing => {
                error!("ringtone path not found: {}", alarm.ringtone.display());
            }
            Ring::Failed(e) => error!("couldn't start alarm: {e}"),
            Ring::Started(_) | Ring::AlreadyRinging | Ring::Suppressed => {}
        }
        Tick::Ring(ring)
    }

    /// true at most once every [`STATUS_INTERVAL`]
    fn status_due(&mut self) -> bool {
        let due = self
            .last_status
            .map_or(true, |last| last.elapsed() >= STATUS_INTERVAL);
        if due {
            self.last_status = Some(Instant::now());
        }
        due
    }

    /// Checks the alarm forever.
    ///
    /// A panic during a tick is logged and followed by a short back off; it
    /// never ends the loop.
    pub fn run(mut self) -> ! {
        info!("alarm checker started");
        loop {
            let wait = guarded(|| {
                self.tick(&AlarmTime::now());
            });
            thread::sleep(wait);
        }
    }
}

/// Runs one iteration of the checker, returning how long to wait before the
/// next one.
fn guarded(iteration: impl FnOnce()) -> Duration {
    match panic::catch_unwind(AssertUnwindSafe(iteration)) {
        Ok(()) => until_next_second(),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("alarm checker error: {reason}");
            ERROR_BACKOFF
        }
    }
}

fn until_next_second() -> Duration {
    let nanos = chrono::Local::now().nanosecond() % 1_000_000_000;
    Duration::from_nanos(u64::from(1_000_000_000 - nanos))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf, sync::atomic::Ordering};

    use super::*;
    use crate::{
        playback::testing::{controller, Call, FakeBackend},
        settings::AlarmRecord,
    };

    struct Harness {
        _dir: tempfile::TempDir,
        tone: PathBuf,
        store: SettingsStore,
        backend: Arc<FakeBackend>,
        controller: Arc<PlaybackController>,
        trigger: TriggerLoop,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir_all(&music).unwrap();
        let tone = music.join("rooster.mp3");
        fs::write(&tone, b"").unwrap();

        let store = SettingsStore::new(dir.path().join("alarm_settings.json"));
        let resolver = RingtoneResolver::with_dirs(music, dir.path().to_path_buf());
        let (backend, controller) = controller();
        let controller = Arc::new(controller);
        let trigger = TriggerLoop::new(store.clone(), resolver, controller.clone());
        Harness {
            _dir: dir,
            tone,
            store,
            backend,
            controller,
            trigger,
        }
    }

    fn at(hour: &str, minute: &str, ampm: &str) -> AlarmTime {
        AlarmTime::normalize(hour, minute, ampm)
    }

    impl Harness {
        fn save(&self, hour: &str, minute: &str, ampm: &str) {
            let record = AlarmRecord::new(at(hour, minute, ampm), self.tone.clone());
            self.store.save(&record).unwrap();
        }
    }

    #[test]
    fn nothing_happens_without_an_alarm() {
        let mut h = harness();
        assert!(matches!(
            h.trigger.tick(&at("7", "5", "AM")),
            Tick::Unconfigured
        ));
        assert!(h.backend.calls().is_empty());
    }

    #[test]
    fn waits_until_time_matches() {
        let mut h = harness();
        h.save("07", "05", "AM");
        assert!(matches!(h.trigger.tick(&at("7", "4", "AM")), Tick::Waiting));
        assert!(matches!(h.trigger.tick(&at("7", "5", "PM")), Tick::Waiting));
        assert_eq!(h.backend.starts(), 0);
    }

    #[test]
    fn rings_exactly_once_while_matching() {
        let mut h = harness();
        h.save("07", "05", "AM");
        let now = at("7", "5", "AM");
        assert!(matches!(h.trigger.tick(&now), Tick::Ring(Ring::Started(_))));
        for _ in 0..5 {
            assert!(matches!(
                h.trigger.tick(&now),
                Tick::Ring(Ring::AlreadyRinging)
            ));
        }
        assert_eq!(h.backend.calls(), vec![Call::Start(h.tone.clone())]);
        assert!(h.controller.is_ringing());
    }

    #[test]
    fn wake_up_scenario() {
        let mut h = harness();
        h.save("07", "05", "AM");

        h.trigger.tick(&at("7", "5", "AM"));
        assert!(h.controller.is_ringing());

        // stopped from the web page during the same minute
        h.controller.stop_at(&at("7", "5", "AM"));
        assert!(!h.controller.is_ringing());
        assert!(matches!(
            h.trigger.tick(&at("7", "5", "AM")),
            Tick::Ring(Ring::Suppressed)
        ));
        assert!(!h.controller.is_ringing());

        // the minute rolls over, suppression lifts, and the stored time no
        // longer matches
        assert!(matches!(h.trigger.tick(&at("7", "6", "AM")), Tick::Waiting));
        assert_eq!(h.controller.suppressed_until(), None);
        assert_eq!(h.backend.starts(), 1);
    }

    #[test]
    fn minute_rollover_rearms_alarm() {
        let mut h = harness();
        h.save("07", "05", "AM");
        h.trigger.tick(&at("7", "4", "AM"));
        h.controller.stop_at(&at("7", "4", "AM"));
        assert_eq!(h.controller.suppressed_until().as_deref(), Some("07:04 AM"));

        assert!(matches!(
            h.trigger.tick(&at("7", "5", "AM")),
            Tick::Ring(Ring::Started(_))
        ));
    }

    #[test]
    fn missing_ringtone_retries_next_tick() {
        let mut h = harness();
        h.save("07", "05", "AM");
        fs::remove_file(&h.tone).unwrap();
        let now = at("7", "5", "AM");
        assert!(matches!(
            h.trigger.tick(&now),
            Tick::Ring(Ring::RingtoneMissing)
        ));

        fs::write(&h.tone, b"").unwrap();
        assert!(matches!(h.trigger.tick(&now), Tick::Ring(Ring::Started(_))));
    }

    #[test]
    fn playback_failure_keeps_checking() {
        let mut h = harness();
        h.save("07", "05", "AM");
        h.backend.fail.store(true, Ordering::SeqCst);
        let now = at("7", "5", "AM");
        assert!(matches!(h.trigger.tick(&now), Tick::Ring(Ring::Failed(_))));
        assert!(!h.controller.is_ringing());

        h.backend.fail.store(false, Ordering::SeqCst);
        assert!(matches!(h.trigger.tick(&now), Tick::Ring(Ring::Started(_))));
    }

    #[test]
    fn panicking_iteration_backs_off() {
        assert_eq!(guarded(|| panic!("settings exploded")), ERROR_BACKOFF);
        assert_eq!(
            guarded(|| panic!("{} exploded", "settings")),
            ERROR_BACKOFF
        );
    }

    #[test]
    fn checking_continues_after_a_panic() {
        let mut h = harness();
        h.save("07", "05", "AM");
        assert_eq!(guarded(|| panic!("bad tick")), ERROR_BACKOFF);

        let mut ring = None;
        let wait = guarded(|| ring = Some(h.trigger.tick(&at("7", "5", "AM"))));
        assert!(wait <= Duration::from_secs(1));
        assert!(matches!(ring, Some(Tick::Ring(Ring::Started(_)))));
    }

    #[test]
    fn status_is_logged_every_interval() {
        let mut h = harness();
        assert!(h.trigger.status_due());
        assert!(!h.trigger.status_due());
        assert!(!h.trigger.status_due());

        h.trigger.last_status = Instant::now().checked_sub(STATUS_INTERVAL);
        assert!(h.trigger.status_due());
        assert!(!h.trigger.status_due());
    }

    #[test]
    fn next_second_is_bounded() {
        let wait = until_next_second();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(1));
    }
}
