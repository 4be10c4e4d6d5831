use std::collections::VecDeque;

use chrono::{DateTime, Utc};

pub const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: EntryLevel,
}

/// Human-readable status log shown next to the page in debug mode.
/// Newest entry first; the oldest is dropped past [`MAX_ENTRIES`].
#[derive(Debug, Default)]
pub struct DebugOverlay {
    entries: VecDeque<OverlayEntry>,
    visible: bool,
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.log("Debug mode activated");
    }

    /// Hide the overlay and forget its entries.
    pub fn hide(&mut self) {
        self.visible = false;
        self.entries.clear();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.push(message.into(), EntryLevel::Info);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message.into(), EntryLevel::Error);
    }

    fn push(&mut self, message: String, level: EntryLevel) {
        self.entries.push_front(OverlayEntry {
            timestamp: Utc::now(),
            message,
            level,
        });
        self.entries.truncate(MAX_ENTRIES);
    }

    pub fn entries(&self) -> impl Iterator<Item = &OverlayEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `[HH:MM:SS] message` per entry, UTC, newest first.
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("[{}] {}", clock(&e.timestamp), e.message))
            .collect()
    }
}

fn clock(at: &DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}
