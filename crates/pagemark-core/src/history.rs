//! Linear undo/redo over encoded raster snapshots.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::fmt;
use std::sync::Arc;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Immutable encoded copy of the raster surface. Clones share the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<[u8]>);

impl Snapshot {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as a `data:` URL, the form stored in page records.
    pub fn to_data_url(&self) -> String {
        format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(&self.0))
    }

    /// Parse a `data:` URL. Any `data:<mime>;base64,` prefix is accepted;
    /// a bare base64 payload is accepted too.
    pub fn from_data_url(url: &str) -> Result<Self, base64::DecodeError> {
        let payload = match url.strip_prefix("data:") {
            Some(rest) => rest.split_once(";base64,").map_or(rest, |(_, data)| data),
            None => url,
        };
        Ok(Self::from_bytes(STANDARD.decode(payload.trim())?))
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({} bytes)", self.0.len())
    }
}

/// What the surface must be restored to after an undo/redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restore {
    /// Decode and blit this snapshot.
    Snapshot(Snapshot),
    /// The synthetic pre-first-stroke state: clear the surface to empty.
    Clear,
}

/// Ordered snapshots plus the current step.
///
/// `step` is `-1` before the first stroke and otherwise indexes the
/// snapshot currently shown; it always satisfies `-1 <= step <= len - 1`.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: Vec<Snapshot>,
    step: isize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    /// Create an empty history over an empty surface.
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            step: -1,
        }
    }

    /// A history whose first entry is `initial` (e.g. a drawing loaded
    /// from storage). Undoing past it still reaches the empty state.
    pub fn seeded(initial: Option<Snapshot>) -> Self {
        let mut history = Self::new();
        if let Some(snapshot) = initial {
            history.push(snapshot);
        }
        history
    }

    /// Drop all snapshots and start over from `initial`.
    pub fn reset(&mut self, initial: Option<Snapshot>) {
        *self = Self::seeded(initial);
    }

    /// Record a completed stroke. Discards the redo branch.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.truncate((self.step + 1) as usize);
        self.snapshots.push(snapshot);
        self.step = self.snapshots.len() as isize - 1;
    }

    /// Step back. Returns what to restore, or `None` at the empty state.
    pub fn undo(&mut self) -> Option<Restore> {
        match self.step {
            -1 => None,
            0 => {
                self.step = -1;
                Some(Restore::Clear)
            }
            _ => {
                self.step -= 1;
                Some(Restore::Snapshot(self.snapshots[self.step as usize].clone()))
            }
        }
    }

    /// Step forward. Returns what to restore, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Restore> {
        if !self.can_redo() {
            return None;
        }
        self.step += 1;
        Some(Restore::Snapshot(self.snapshots[self.step as usize].clone()))
    }

    pub fn can_undo(&self) -> bool {
        self.step >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.step < self.snapshots.len() as isize - 1
    }

    /// Current step, `-1` for the empty state.
    pub fn step(&self) -> isize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot shown at the current step; `None` at the empty state.
    pub fn current(&self) -> Option<&Snapshot> {
        usize::try_from(self.step).ok().and_then(|i| self.snapshots.get(i))
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }
}
