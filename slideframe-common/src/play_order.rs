use std::collections::BTreeSet;
use rand::seq::SliceRandom;

/// Outcome of moving the cursor forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Stepped,
    /// The last image was reached; the order was reshuffled and the cursor wrapped.
    Wrapped,
}

/// Shuffled sequence of image names for the active playlist plus the cursor
/// addressing the image on screen. Never empty, and `cursor < images.len()`.
#[derive(Debug, Clone)]
pub struct PlayOrder {
    images: Vec<String>,
    cursor: usize,
}

impl PlayOrder {
    pub fn shuffled(images: impl IntoIterator<Item = String>) -> Option<Self> {
        let mut order = Self::in_order(images)?;
        order.reshuffle();
        Some(order)
    }

    /// Keeps the given order. Returns `None` for an empty image set.
    pub fn in_order(images: impl IntoIterator<Item = String>) -> Option<Self> {
        let images: Vec<String> = images.into_iter().collect();
        if images.is_empty() {
            return None;
        }

        Some(Self { images, cursor: 0 })
    }

    pub fn current(&self) -> &str {
        &self.images[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn image_set(&self) -> BTreeSet<&str> {
        self.images.iter().map(String::as_str).collect()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor + 1 >= self.images.len()
    }

    /// Puts new images right after the cursor so they are shown next.
    /// The cursor keeps addressing the same image.
    pub fn insert_after_cursor(&mut self, added: impl IntoIterator<Item = String>) {
        let at = self.cursor + 1;
        self.images.splice(at..at, added);
    }

    /// Replaces the whole order and rewinds the cursor. An empty replacement
    /// leaves the order untouched and returns `false`.
    pub fn replace(&mut self, images: impl IntoIterator<Item = String>) -> bool {
        let images: Vec<String> = images.into_iter().collect();
        if images.is_empty() {
            return false;
        }

        self.images = images;
        self.cursor = 0;
        true
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn reshuffle(&mut self) {
        let mut rng = rand::thread_rng();
        self.images.shuffle(&mut rng);
        self.cursor = 0;
    }

    pub fn advance(&mut self) -> Advance {
        if self.is_at_end() {
            self.reshuffle();
            Advance::Wrapped
        } else {
            self.cursor += 1;
            Advance::Stepped
        }
    }
}
