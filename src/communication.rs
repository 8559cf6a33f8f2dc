use std::{path::PathBuf, sync::mpsc::Sender, time::Duration};

use crate::error::PlaybackError;

/// requests sent to the audio thread
#[derive(Debug)]
pub enum Message {
    /// replace whatever is looping with `path`, repeated until stopped
    StartLoop {
        path: PathBuf,
        reply: Sender<Result<(), PlaybackError>>,
    },
    StopLoop,
    /// play `path` once, cut off after `duration`
    Preview {
        id: u64,
        path: PathBuf,
        duration: Duration,
        reply: Sender<Result<(), PlaybackError>>,
    },
    /// stop preview `id`, if it's still the one playing
    StopPreview(u64),
    /// is the looping sink still producing sound
    IsLooping(Sender<bool>),
}
