use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

const RINGTONE_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Turns what the user picked in the form into a ringtone file on disk.
#[derive(Debug, Clone)]
pub struct RingtoneResolver {
    music_dir: PathBuf,
    app_dir: PathBuf,
}

impl RingtoneResolver {
    /// Uses `preferred` as the music directory when it exists, otherwise the
    /// `music` directory next to the program.
    #[must_use]
    pub fn new(preferred: Option<PathBuf>, app_dir: PathBuf) -> Self {
        let music_dir = match preferred {
            Some(dir) if dir.is_dir() => dir,
            Some(dir) => {
                warn!(
                    "music directory {} not found, falling back to {}",
                    dir.display(),
                    app_dir.join("music").display()
                );
                app_dir.join("music")
            }
            None => app_dir.join("music"),
        };
        Self::with_dirs(music_dir, app_dir)
    }

    #[must_use]
    pub const fn with_dirs(music_dir: PathBuf, app_dir: PathBuf) -> Self {
        Self { music_dir, app_dir }
    }

    #[must_use]
    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Finds an existing file for `raw`, returning it as an absolute path.
    ///
    /// A value that already points inside the music directory is checked as is
    /// before anything gets joined onto it, so a path resolved on a previous
    /// save doesn't end up prefixed twice.
    #[must_use]
    pub fn resolve(&self, raw: impl AsRef<Path>) -> Option<PathBuf> {
        let raw_path = raw.as_ref();
        if raw_path.as_os_str().is_empty() {
            return None;
        }
        let mut candidates = Vec::with_capacity(4);
        if raw_path.starts_with(&self.music_dir) {
            candidates.push(raw_path.to_path_buf());
        }
        if raw_path.is_absolute() {
            candidates.push(raw_path.to_path_buf());
        }
        candidates.push(self.music_dir.join(raw_path));
        candidates.push(self.app_dir.join(raw_path));

        let hit = candidates.into_iter().find(|candidate| candidate.is_file())?;
        Some(std::path::absolute(&hit).unwrap_or(hit))
    }

    /// All `.mp3` and `.wav` files directly inside the music directory, sorted.
    #[must_use]
    pub fn catalog(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.music_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("couldn't list {}: {e}", self.music_dir.display());
                return vec![];
            }
        };
        let mut tones: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_ringtone(path))
            .map(|path| std::path::absolute(&path).unwrap_or(path))
            .collect();
        tones.sort();
        tones
    }
}

fn is_ringtone(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| {
            RINGTONE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
