use std::{
    fs::File,
    io::BufReader,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::{communication::Message, error::PlaybackError, playback::AudioBackend};

/// Plays sounds through the default output device.
///
/// The output stream lives on its own thread for the life of the process and
/// everything else talks to it over a channel.
#[derive(Debug)]
pub struct RodioBackend {
    sender: Sender<Message>,
    next_preview: AtomicU64,
}

impl RodioBackend {
    /// Opens the default output device.
    ///
    /// # Errors
    /// [`PlaybackError::DeviceUnavailable`] when there is no usable output device
    pub fn open() -> Result<Self, PlaybackError> {
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run(&stream, &receiver);
            })
            .map_err(|e| {
                warn!("couldn't spawn audio thread: {e}");
                PlaybackError::DeviceUnavailable
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("audio device ready");
                Ok(Self {
                    sender,
                    next_preview: AtomicU64::new(0),
                })
            }
            Ok(Err(reason)) => {
                warn!("couldn't open audio device: {reason}");
                Err(PlaybackError::DeviceUnavailable)
            }
            Err(_) => Err(PlaybackError::DeviceUnavailable),
        }
    }

    fn request(
        &self,
        make: impl FnOnce(Sender<Result<(), PlaybackError>>) -> Message,
    ) -> Result<(), PlaybackError> {
        let (reply, response) = mpsc::channel();
        self.sender
            .send(make(reply))
            .map_err(|_| PlaybackError::Disconnected)?;
        response.recv().map_err(|_| PlaybackError::Disconnected)?
    }
}

impl AudioBackend for RodioBackend {
    fn start_loop(&self, path: &Path) -> Result<(), PlaybackError> {
        self.request(|reply| Message::StartLoop {
            path: path.to_path_buf(),
            reply,
        })
    }

    fn stop_loop(&self) {
        if self.sender.send(Message::StopLoop).is_err() {
            warn!("audio thread is gone, nothing to stop");
        }
    }

    fn preview(&self, path: &Path, duration: Duration) -> Result<(), PlaybackError> {
        let id = self.next_preview.fetch_add(1, Ordering::Relaxed);
        self.request(|reply| Message::Preview {
            id,
            path: path.to_path_buf(),
            duration,
            reply,
        })?;
        thread::sleep(duration);
        let _ = self.sender.send(Message::StopPreview(id));
        Ok(())
    }

    fn is_looping(&self) -> bool {
        let (reply, response) = mpsc::channel();
        if self.sender.send(Message::IsLooping(reply)).is_err() {
            return false;
        }
        response.recv().unwrap_or(false)
    }
}

fn run(stream: &OutputStream, receiver: &Receiver<Message>) {
    let mut looping: Option<Sink> = None;
    let mut preview = PreviewSlot::new();
    for message in receiver {
        match message {
            Message::StartLoop { path, reply } => {
                let result = open_sound(&path).map(|sound| {
                    if let Some(old) = looping.take() {
                        old.stop();
                    }
                    // repeat until told to stop
                    let sink = Sink::connect_new(stream.mixer());
                    sink.append(sound.repeat_infinite());
                    sink.play();
                    looping = Some(sink);
                    debug!("looping {}", path.display());
                });
                let _ = reply.send(result);
            }
            Message::StopLoop => {
                if let Some(sink) = looping.take() {
                    sink.stop();
                }
            }
            Message::Preview {
                id,
                path,
                duration,
                reply,
            } => {
                let result = open_sound(&path).map(|sound| {
                    let sink = Sink::connect_new(stream.mixer());
                    sink.append(sound.take_duration(duration));
                    sink.play();
                    if let Some(old) = preview.replace(id, sink) {
                        old.stop();
                    }
                });
                let _ = reply.send(result);
            }
            Message::StopPreview(id) => {
                if let Some(sink) = preview.take_matching(id) {
                    sink.stop();
                }
            }
            Message::IsLooping(reply) => {
                let _ = reply.send(looping.as_ref().is_some_and(|sink| !sink.empty()));
            }
        }
    }
}

/// The one preview that may be playing, tagged with the request that started
/// it so a late stop for an older preview can't cut off a newer one.
#[derive(Debug)]
struct PreviewSlot<S> {
    current: Option<(u64, S)>,
}

impl<S> PreviewSlot<S> {
    const fn new() -> Self {
        Self { current: None }
    }

    /// makes `sink` the current preview, handing back the one it displaced
    fn replace(&mut self, id: u64, sink: S) -> Option<S> {
        self.current.replace((id, sink)).map(|(_, old)| old)
    }

    fn take_matching(&mut self, id: u64) -> Option<S> {
        match self.current.take() {
            Some((current, sink)) if current == id => Some(sink),
            other => {
                self.current = other;
                None
            }
        }
    }
}

fn open_sound(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path).map_err(|source| PlaybackError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
