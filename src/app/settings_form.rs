// src/app/settings_form.rs
// Editing rules of the inference settings window: the debounced context size field and derived batch values.

use crate::app::config::{CacheType, InferenceSettings, MIN_CONTEXT_SIZE};
use log::debug;
use std::time::{Duration, Instant};

pub const CONTEXT_COMMIT_DELAY: Duration = Duration::from_millis(500);

/// Batch size the engine will actually use.
pub fn effective_batch(settings: &InferenceSettings) -> u32 {
    settings.n_batch.min(settings.n_context)
}

pub fn effective_ubatch(settings: &InferenceSettings) -> u32 {
    settings.n_ubatch.min(settings.n_batch).min(settings.n_context)
}

/// Quantised KV caches only work with flash attention.
pub fn cache_type_allowed(settings: &InferenceSettings, cache_type: CacheType) -> bool {
    settings.flash_attn || cache_type == CacheType::F16
}

/// Turning flash attention off forces both caches back to F16.
pub fn set_flash_attn(settings: &mut InferenceSettings, enabled: bool) {
    settings.flash_attn = enabled;
    if !enabled {
        settings.cache_type_k = CacheType::F16;
        settings.cache_type_v = CacheType::F16;
    }
}

/// Holds one pending value until `delay` has passed since the last schedule.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Replaces any pending value and restarts the timer.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left until the pending value fires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, due)| due.saturating_duration_since(now))
    }

    /// Returns the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }
}

/// Parses context size text. `None` when not an integer or below the minimum.
pub fn parse_context_size(text: &str) -> Option<u32> {
    text.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n >= MIN_CONTEXT_SIZE)
}

/// State of the context size text field.
#[derive(Debug, Clone)]
pub struct ContextSizeInput {
    pub text: String,
    committed: u32,
    invalid: bool,
    debouncer: Debouncer<u32>,
}

impl ContextSizeInput {
    pub fn new(committed: u32) -> Self {
        Self {
            text: committed.to_string(),
            committed,
            invalid: false,
            debouncer: Debouncer::new(CONTEXT_COMMIT_DELAY),
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn committed(&self) -> u32 {
        self.committed
    }

    pub fn debouncer(&self) -> &Debouncer<u32> {
        &self.debouncer
    }

    /// Call after the text changed.
    pub fn on_edit(&mut self, now: Instant) {
        match parse_context_size(&self.text) {
            Some(value) => {
                self.invalid = false;
                self.debouncer.schedule(value, now);
            }
            None => {
                self.invalid = true;
                self.debouncer.cancel();
            }
        }
    }

    /// Returns a value to store once the field has been quiet long enough.
    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        let value = self.debouncer.poll(now)?;
        if value == self.committed {
            return None;
        }
        debug!("Committing context size {}.", value);
        self.committed = value;
        Some(value)
    }

    /// Focus left the field: show the committed value again.
    pub fn on_blur(&mut self) {
        if !self.debouncer.is_pending() {
            self.text = self.committed.to_string();
            self.invalid = false;
        }
    }

    /// Window closed; drop whatever was pending.
    pub fn close(&mut self) {
        self.debouncer.cancel();
        self.text = self.committed.to_string();
        self.invalid = false;
    }
}
