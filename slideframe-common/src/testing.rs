//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;

use crate::error::{ImageDiscoveryError, RenderError, SlideframeError};
use crate::image_discovery::ImageSource;
use crate::power::{PowerToggle, PowerToggleReport};
use crate::render::Renderer;
use crate::schedule::Clock;
use crate::Result;

/// Playlists held in memory; clones share the same contents so a test can
/// mutate the "filesystem" after handing a clone to the code under test.
#[derive(Clone, Default)]
pub struct MemorySource {
    playlists: Arc<Mutex<BTreeMap<String, BTreeSet<String>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, playlist: &str, images: &[&str]) {
        let images = images.iter().map(|s| s.to_string()).collect();
        self.playlists.lock().unwrap().insert(playlist.to_string(), images);
    }

    pub fn remove(&self, playlist: &str) {
        self.playlists.lock().unwrap().remove(playlist);
    }
}

impl ImageSource for MemorySource {
    fn root(&self) -> &Path {
        Path::new("memory")
    }

    fn list_playlists(&self) -> Result<Vec<String>> {
        Ok(self.playlists.lock().unwrap().keys().cloned().collect())
    }

    fn list_images(&self, playlist: &str) -> Result<BTreeSet<String>> {
        self.playlists
            .lock()
            .unwrap()
            .get(playlist)
            .cloned()
            .ok_or_else(|| {
                SlideframeError::ImageDiscovery(ImageDiscoveryError::DirectoryRead {
                    path: PathBuf::from(playlist),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                })
            })
    }

    fn image_path(&self, playlist: &str, image: &str) -> PathBuf {
        PathBuf::from(playlist).join(image)
    }
}

/// Records every requested power state and answers with a scripted outcome.
#[derive(Clone, Default)]
pub struct RecordingToggle {
    pub calls: Arc<Mutex<Vec<bool>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl RecordingToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let toggle = Self::default();
        *toggle.fail.lock().unwrap() = true;
        toggle
    }

    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

impl PowerToggle for RecordingToggle {
    fn set_display_power(&mut self, on: bool) -> PowerToggleReport {
        self.calls.lock().unwrap().push(on);
        if *self.fail.lock().unwrap() {
            PowerToggleReport::failed("exit code 1: can't open display")
        } else {
            PowerToggleReport::ok("")
        }
    }
}

/// Records rendered paths; paths listed in `broken` fail to render.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub shown: Arc<Mutex<Vec<PathBuf>>>,
    pub broken: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<PathBuf> {
        self.shown.lock().unwrap().clone()
    }

    pub fn break_all(&self, paths: impl IntoIterator<Item = PathBuf>) {
        self.broken.lock().unwrap().extend(paths);
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, image: &Path) -> std::result::Result<(), RenderError> {
        if self.broken.lock().unwrap().iter().any(|p| p == image) {
            return Err(RenderError::Missing {
                path: image.to_path_buf(),
            });
        }
        self.shown.lock().unwrap().push(image.to_path_buf());
        Ok(())
    }
}

/// Hands out the scripted times in order, repeating the last one forever.
pub struct ScriptedClock {
    times: Mutex<VecDeque<NaiveDateTime>>,
    last: Mutex<NaiveDateTime>,
}

impl ScriptedClock {
    pub fn new(times: &[NaiveDateTime]) -> Self {
        Self {
            times: Mutex::new(times.iter().copied().collect()),
            last: Mutex::new(times[0]),
        }
    }

    pub fn fixed(time: NaiveDateTime) -> Self {
        Self::new(&[time])
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> NaiveDateTime {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.times.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .unwrap()
}
