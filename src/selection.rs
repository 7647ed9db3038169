use std::time::{Duration, Instant};

use rand::seq::IndexedRandom;

use crate::media_types::MediaListEntry;
use crate::settings::SelectionMode;

/// Picks the next current item from a photo listing under the configured
/// policy and tracks how long the current choice has been shown.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    selected_at: Option<Instant>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next item under `mode`, or `None` when the policy leaves the current
    /// selection unchanged.
    pub fn next(
        &self,
        mode: SelectionMode,
        current_id: Option<&str>,
        photos: &[MediaListEntry],
    ) -> Option<MediaListEntry> {
        match mode {
            SelectionMode::Random => Self::select_random(photos),
            SelectionMode::Sequential => Self::select_sequential(current_id, photos),
        }
    }

    /// Uniform pick over the photo listing. A single-item listing is left
    /// unchanged: re-selecting the only item would just churn caches.
    fn select_random(photos: &[MediaListEntry]) -> Option<MediaListEntry> {
        if photos.len() < 2 {
            return None;
        }
        photos.choose(&mut rand::rng()).cloned()
    }

    /// The item following the current one in listing order, wrapping at the
    /// end. A current item that fell out of the cached listing restarts at
    /// the first item.
    fn select_sequential(
        current_id: Option<&str>,
        photos: &[MediaListEntry],
    ) -> Option<MediaListEntry> {
        if photos.is_empty() {
            return None;
        }
        let next_index = current_id
            .and_then(|id| photos.iter().position(|m| m.id == id))
            .map(|i| (i + 1) % photos.len())
            .unwrap_or(0);
        Some(photos[next_index].clone())
    }

    /// Record that a new item was just put on display.
    pub fn mark_selected(&mut self) {
        self.selected_at = Some(Instant::now());
    }

    /// Time since the current item was selected; `None` when nothing has
    /// been selected yet.
    pub fn elapsed_since_selection(&self) -> Option<Duration> {
        self.selected_at.map(|at| at.elapsed())
    }
}
