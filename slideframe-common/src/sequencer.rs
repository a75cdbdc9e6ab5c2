use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::image_discovery::ImageSource;
use crate::play_order::{Advance, PlayOrder};
use crate::Result;

/// Structural change applied to the play order after comparing it with a
/// fresh directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Unchanged,
    /// Images were only added; they were queued right after the cursor.
    Added(Vec<String>),
    /// Images were removed (possibly alongside additions); the order was
    /// replaced by the listing and the cursor rewound.
    Replaced { added: usize, removed: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerStatus {
    pub playlist: String,
    /// `None` until the active playlist has been listed and shuffled.
    pub current_image: Option<String>,
    pub position: usize,
    pub total: usize,
}

/// Owns the playlists, the active play order and the rotation state.
pub struct PlaylistSequencer {
    source: Box<dyn ImageSource>,
    playlists: Vec<String>,
    active: String,
    activated_at: Instant,
    // Set on rotation: the next reconciliation reshuffles from a fresh
    // listing instead of diffing against the previous playlist.
    dirty: bool,
    order: PlayOrder,
    rotation_interval: Duration,
}

impl PlaylistSequencer {
    /// Discovers playlists and activates `initial` (or a random one).
    /// Fails when there is nothing to show.
    pub fn new(
        source: Box<dyn ImageSource>,
        initial: Option<&str>,
        rotation_interval: Duration,
    ) -> Result<Self> {
        let playlists = source.list_playlists()?;
        if playlists.is_empty() {
            return Err(ConfigError::NoPlaylists {
                path: source.root().to_path_buf(),
            }
            .into());
        }

        let active = match initial {
            Some(name) if playlists.iter().any(|p| p == name) => name.to_string(),
            Some(name) => {
                return Err(ConfigError::UnknownPlaylist {
                    name: name.to_string(),
                }
                .into());
            }
            None => {
                let mut rng = rand::thread_rng();
                // Non-empty, checked above
                playlists.choose(&mut rng).cloned().unwrap_or_default()
            }
        };

        let images = source.list_images(&active)?;
        let order = PlayOrder::shuffled(images).ok_or_else(|| ConfigError::EmptyPlaylist {
            name: active.clone(),
        })?;

        log::info!(
            "Starting with playlist '{}' ({} images, {} playlists available)",
            active,
            order.len(),
            playlists.len()
        );

        Ok(Self {
            source,
            playlists,
            active,
            activated_at: Instant::now(),
            dirty: true,
            order,
            rotation_interval,
        })
    }

    pub fn active_playlist(&self) -> &str {
        &self.active
    }

    pub fn playlists(&self) -> &[String] {
        &self.playlists
    }

    pub fn play_order(&self) -> &PlayOrder {
        &self.order
    }

    pub fn rotation_interval(&self) -> Duration {
        self.rotation_interval
    }

    pub fn current_path(&self) -> PathBuf {
        self.source.image_path(&self.active, self.order.current())
    }

    pub fn status(&self) -> SequencerStatus {
        // After a rotation the order still holds the previous playlist
        if self.dirty {
            return SequencerStatus {
                playlist: self.active.clone(),
                current_image: None,
                position: 0,
                total: 0,
            };
        }

        SequencerStatus {
            playlist: self.active.clone(),
            current_image: Some(self.order.current().to_string()),
            position: self.order.cursor(),
            total: self.order.len(),
        }
    }

    /// Switches to a random playlist other than the active one. Returns the
    /// new playlist name, or `None` when there is nothing to switch to.
    pub fn select_next_playlist(&mut self) -> Option<&str> {
        self.select_next_at(Instant::now())
    }

    fn select_next_at(&mut self, now: Instant) -> Option<&str> {
        self.refresh_playlists();

        let candidates: Vec<&String> = self
            .playlists
            .iter()
            .filter(|name| **name != self.active)
            .collect();

        let mut rng = rand::thread_rng();
        let next = match candidates.choose(&mut rng) {
            Some(name) => (*name).clone(),
            None => {
                log::debug!(
                    "Only playlist '{}' available, keeping it",
                    self.active
                );
                return None;
            }
        };

        self.active = next;
        self.activated_at = now;
        self.order.rewind();
        self.dirty = true;
        log::info!("Switched playlist to '{}'", self.active);

        Some(self.active.as_str())
    }

    // New playlist directories are picked up on rotation. A failed listing
    // keeps the previously known set.
    fn refresh_playlists(&mut self) {
        match self.source.list_playlists() {
            Ok(playlists) if !playlists.is_empty() => self.playlists = playlists,
            Ok(_) => log::warn!("No playlists found while rotating, keeping known set"),
            Err(e) => log::warn!("Failed to refresh playlists, keeping known set: {}", e),
        }
    }

    /// Rotates when the active playlist has been shown longer than the
    /// rotation interval.
    pub fn maybe_rotate_on_schedule(&mut self) -> bool {
        self.maybe_rotate_at(Instant::now())
    }

    pub fn maybe_rotate_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.activated_at);
        if elapsed <= self.rotation_interval {
            return false;
        }

        log::debug!(
            "Playlist '{}' active for {}, rotating",
            self.active,
            humantime::format_duration(Duration::from_secs(elapsed.as_secs()))
        );
        self.select_next_at(now).is_some()
    }

    /// Per-tick step: re-lists the active playlist, folds filesystem changes
    /// into the play order and moves the cursor. Returns the image to show.
    pub fn reconcile_and_advance(&mut self) -> Result<PathBuf> {
        let listing = self.source.list_images(&self.active)?;
        if listing.is_empty() {
            return Err(ConfigError::EmptyPlaylist {
                name: self.active.clone(),
            }
            .into());
        }

        if self.dirty {
            self.order = PlayOrder::shuffled(listing).ok_or_else(|| ConfigError::EmptyPlaylist {
                name: self.active.clone(),
            })?;
            self.dirty = false;
            log::debug!(
                "Shuffled {} images for playlist '{}'",
                self.order.len(),
                self.active
            );
        } else {
            self.apply_listing(listing);
            if self.order.advance() == Advance::Wrapped {
                log::info!("End of playlist reached. Shuffle and repeat.");
            }
        }

        Ok(self.current_path())
    }

    /// Rotates right away and returns the first image of the new playlist.
    pub fn request_immediate_rotation(&mut self) -> Result<PathBuf> {
        self.select_next_playlist();
        self.reconcile_and_advance()
    }

    fn apply_listing(&mut self, fresh: BTreeSet<String>) -> Reconciliation {
        let (added, removed) = {
            let current = self.order.image_set();
            let added: Vec<String> = fresh
                .iter()
                .filter(|name| !current.contains(name.as_str()))
                .cloned()
                .collect();
            let removed = current.iter().filter(|name| !fresh.contains(**name)).count();
            (added, removed)
        };

        if added.is_empty() && removed == 0 {
            return Reconciliation::Unchanged;
        }

        if removed == 0 {
            log::info!(
                "New images detected in '{}'. Inserting them to display them next: {:?}",
                self.active,
                added
            );
            self.order.insert_after_cursor(added.iter().cloned());
            return Reconciliation::Added(added);
        }

        if !added.is_empty() {
            log::warn!(
                "Images were added and removed in '{}' since the last check; removals take precedence",
                self.active
            );
        }
        if !self.order.replace(fresh) {
            log::warn!("Empty listing for '{}', keeping the current order", self.active);
            return Reconciliation::Unchanged;
        }
        log::info!(
            "{} images were removed from '{}'. Updating playlist.",
            removed,
            self.active
        );

        Reconciliation::Replaced {
            added: added.len(),
            removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlideframeError;
    use crate::testing::MemorySource;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sequencer(source: &MemorySource, initial: &str) -> PlaylistSequencer {
        PlaylistSequencer::new(
            Box::new(source.clone()),
            Some(initial),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    // Puts the sequencer in a known, already reconciled state.
    fn with_order(sequencer: &mut PlaylistSequencer, order: &[&str], cursor: usize) {
        let mut play_order = PlayOrder::in_order(names(order)).unwrap();
        for _ in 0..cursor {
            play_order.advance();
        }
        sequencer.order = play_order;
        sequencer.dirty = false;
    }

    #[test]
    fn test_new_requires_playlists() {
        let source = MemorySource::new();

        match PlaylistSequencer::new(Box::new(source), None, Duration::from_secs(60)) {
            Err(SlideframeError::Config(ConfigError::NoPlaylists { .. })) => {}
            other => panic!("Expected NoPlaylists, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_new_rejects_empty_initial_playlist() {
        let source = MemorySource::new();
        source.set("empty", &[]);

        match PlaylistSequencer::new(Box::new(source), Some("empty"), Duration::from_secs(60)) {
            Err(SlideframeError::Config(ConfigError::EmptyPlaylist { name })) => {
                assert_eq!(name, "empty");
            }
            other => panic!("Expected EmptyPlaylist, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_new_rejects_unknown_initial_playlist() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg"]);

        match PlaylistSequencer::new(Box::new(source), Some("forest"), Duration::from_secs(60)) {
            Err(SlideframeError::Config(ConfigError::UnknownPlaylist { name })) => {
                assert_eq!(name, "forest");
            }
            other => panic!("Expected UnknownPlaylist, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_new_picks_random_playlist_without_initial() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg"]);
        source.set("forest", &["b.jpg"]);

        let sequencer =
            PlaylistSequencer::new(Box::new(source), None, Duration::from_secs(60)).unwrap();

        assert!(["beach", "forest"].contains(&sequencer.active_playlist()));
    }

    #[test]
    fn test_select_never_repeats_active_playlist() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg"]);
        source.set("forest", &["b.jpg"]);
        source.set("city", &["c.jpg"]);

        let mut sequencer = sequencer(&source, "beach");

        for _ in 0..50 {
            let previous = sequencer.active_playlist().to_string();
            let next = sequencer.select_next_playlist().map(str::to_string);
            assert_ne!(next.as_deref(), Some(previous.as_str()));
            assert_ne!(sequencer.active_playlist(), previous);
        }
    }

    #[test]
    fn test_select_with_single_playlist_is_noop() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg", "b.jpg"]);

        let mut sequencer = sequencer(&source, "beach");
        sequencer.reconcile_and_advance().unwrap();

        assert_eq!(sequencer.select_next_playlist(), None);
        assert_eq!(sequencer.active_playlist(), "beach");
        assert!(!sequencer.dirty);
    }

    #[test]
    fn test_select_picks_up_new_playlist_directories() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg"]);

        let mut sequencer = sequencer(&source, "beach");
        assert_eq!(sequencer.select_next_playlist(), None);

        source.set("forest", &["b.jpg"]);
        assert_eq!(sequencer.select_next_playlist(), Some("forest"));
    }

    #[test]
    fn test_rotation_marks_dirty_and_resets_cursor() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg", "b.jpg", "c.jpg"]);
        source.set("forest", &["x.jpg", "y.jpg"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a.jpg", "b.jpg", "c.jpg"], 1);

        sequencer.select_next_playlist();
        assert!(sequencer.dirty);
        assert_eq!(sequencer.play_order().cursor(), 0);

        // Freshly rotated: shuffle from the new listing, no diff, no advance
        let path = sequencer.reconcile_and_advance().unwrap();
        assert!(!sequencer.dirty);
        assert_eq!(sequencer.play_order().cursor(), 0);
        assert_eq!(
            sequencer.play_order().image_set(),
            ["x.jpg", "y.jpg"].into_iter().collect::<BTreeSet<_>>()
        );
        assert!(path.starts_with("forest"));
    }

    #[test]
    fn test_maybe_rotate_respects_interval() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg"]);
        source.set("forest", &["b.jpg"]);

        let mut sequencer = sequencer(&source, "beach");
        let start = sequencer.activated_at;

        assert!(!sequencer.maybe_rotate_at(start + Duration::from_secs(30)));
        assert!(!sequencer.maybe_rotate_at(start + Duration::from_secs(60)));
        assert_eq!(sequencer.active_playlist(), "beach");

        assert!(sequencer.maybe_rotate_at(start + Duration::from_secs(61)));
        assert_eq!(sequencer.active_playlist(), "forest");
    }

    #[test]
    fn test_maybe_rotate_twice_in_same_tick_rotates_once() {
        let source = MemorySource::new();
        source.set("beach", &["a.jpg"]);
        source.set("forest", &["b.jpg"]);

        let mut sequencer = sequencer(&source, "beach");
        let now = sequencer.activated_at + Duration::from_secs(120);

        assert!(sequencer.maybe_rotate_at(now));
        assert!(!sequencer.maybe_rotate_at(now));
        assert_eq!(sequencer.active_playlist(), "forest");
    }

    #[test]
    fn test_added_images_are_shown_next() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a", "b", "c"], 1);

        let change = sequencer.apply_listing(set(&["a", "b", "c", "d"]));

        assert_eq!(change, Reconciliation::Added(names(&["d"])));
        assert_eq!(sequencer.play_order().images(), names(&["a", "b", "d", "c"]).as_slice());
        assert_eq!(sequencer.play_order().current(), "b");
    }

    #[test]
    fn test_reconcile_after_addition_advances_to_new_image() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a", "b", "c"], 1);
        source.set("beach", &["a", "b", "c", "d"]);

        let path = sequencer.reconcile_and_advance().unwrap();

        assert_eq!(path, PathBuf::from("beach").join("d"));
        assert_eq!(sequencer.play_order().cursor(), 2);
    }

    #[test]
    fn test_removed_images_replace_order() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a", "b", "c"], 2);

        let change = sequencer.apply_listing(set(&["a", "c"]));

        assert_eq!(change, Reconciliation::Replaced { added: 0, removed: 1 });
        assert_eq!(sequencer.play_order().cursor(), 0);
        assert_eq!(
            sequencer.play_order().image_set(),
            ["a", "c"].into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_mixed_add_and_remove_prefers_removal() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a", "b", "c"], 1);

        let change = sequencer.apply_listing(set(&["a", "c", "d", "e"]));

        assert_eq!(change, Reconciliation::Replaced { added: 2, removed: 1 });
        assert_eq!(sequencer.play_order().cursor(), 0);
        assert_eq!(sequencer.play_order().images(), names(&["a", "c", "d", "e"]).as_slice());
    }

    #[test]
    fn test_empty_listing_keeps_order() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a", "b", "c"], 1);

        let change = sequencer.apply_listing(BTreeSet::new());

        assert_eq!(change, Reconciliation::Unchanged);
        assert_eq!(sequencer.play_order().images(), names(&["a", "b", "c"]).as_slice());
        assert_eq!(sequencer.play_order().current(), "b");
    }

    #[test]
    fn test_unchanged_listing_keeps_image_set() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c", "d"]);

        let mut sequencer = sequencer(&source, "beach");
        sequencer.reconcile_and_advance().unwrap();
        let before: BTreeSet<String> = sequencer.play_order().images().iter().cloned().collect();

        for _ in 0..10 {
            sequencer.reconcile_and_advance().unwrap();
            let after: BTreeSet<String> =
                sequencer.play_order().images().iter().cloned().collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_end_of_list_reshuffles_and_rewinds() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        with_order(&mut sequencer, &["a", "b", "c"], 2);

        sequencer.reconcile_and_advance().unwrap();

        assert_eq!(sequencer.play_order().cursor(), 0);
        assert_eq!(sequencer.play_order().len(), 3);
    }

    #[test]
    fn test_cursor_stays_in_bounds_under_churn() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);

        let mut sequencer = sequencer(&source, "beach");
        let listings: [&[&str]; 5] = [
            &["a", "b", "c", "d"],
            &["a", "d"],
            &["a", "d", "e", "f", "g"],
            &["g"],
            &["g", "h"],
        ];

        for listing in listings.iter().cycle().take(40) {
            source.set("beach", listing);
            let path = sequencer.reconcile_and_advance().unwrap();
            let order = sequencer.play_order();
            assert!(order.cursor() < order.len());
            assert_eq!(path, PathBuf::from("beach").join(order.current()));
        }
    }

    #[test]
    fn test_emptied_playlist_is_fatal() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b"]);

        let mut sequencer = sequencer(&source, "beach");
        sequencer.reconcile_and_advance().unwrap();
        source.set("beach", &[]);

        let err = sequencer.reconcile_and_advance().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_listing_failure_is_recoverable() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b"]);

        let mut sequencer = sequencer(&source, "beach");
        source.remove("beach");

        let err = sequencer.reconcile_and_advance().unwrap_err();
        assert!(!err.is_fatal());
        // Still dirty, the next tick retries the fresh shuffle
        assert!(sequencer.dirty);
    }

    #[test]
    fn test_status_pending_after_rotation() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b", "c"]);
        source.set("forest", &["x", "y"]);

        let mut sequencer = sequencer(&source, "beach");
        sequencer.reconcile_and_advance().unwrap();
        assert_eq!(sequencer.status().total, 3);

        sequencer.select_next_playlist();
        source.remove("forest");
        assert!(sequencer.reconcile_and_advance().is_err());

        let status = sequencer.status();
        assert_eq!(status.playlist, "forest");
        assert_eq!(status.current_image, None);
        assert_eq!(status.total, 0);

        source.set("forest", &["x", "y"]);
        sequencer.reconcile_and_advance().unwrap();

        let status = sequencer.status();
        assert_eq!(status.total, 2);
        assert!(["x", "y"].contains(&status.current_image.as_deref().unwrap()));
    }

    #[test]
    fn test_status_pending_before_first_tick() {
        let source = MemorySource::new();
        source.set("beach", &["a"]);

        let sequencer = sequencer(&source, "beach");

        assert_eq!(sequencer.status().current_image, None);
    }

    #[test]
    fn test_immediate_rotation_shows_new_playlist() {
        let source = MemorySource::new();
        source.set("beach", &["a", "b"]);
        source.set("forest", &["x", "y", "z"]);

        let mut sequencer = sequencer(&source, "beach");
        sequencer.reconcile_and_advance().unwrap();

        let path = sequencer.request_immediate_rotation().unwrap();

        assert_eq!(sequencer.active_playlist(), "forest");
        assert!(path.starts_with("forest"));
        assert_eq!(sequencer.status().total, 3);
        assert_eq!(sequencer.status().position, 0);
    }
}
