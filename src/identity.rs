//! Per-call identity and display symbols
//!
//! Every recorded entry gets:
//! - A sequence number, unique per thread, starting at 0
//! - A fingerprint (SHA-1 of the decimal sequence number) that ties the console
//!   line to the record in the log file
//! - A mood symbol, cycled through a fixed palette per thread
//! - A clock symbol picked from the wall-clock time, at 30-minute resolution

use chrono::Timelike;
use sha1::{Digest, Sha1};

// =============================================================================
// PALETTES
// =============================================================================

/// Mood symbols, cycled one per call
pub const MOOD_SYMBOLS: [&str; 20] = [
    "😶", "🧐", "🤨", "😬", "🙄", "😑", "😕", "☹️", "😯", "😧", "😵", "😠", "😣", "😖",
    "😫", "😤", "😡", "🤬", "😒", "😪",
];

/// Clock faces from 12:00 to 11:30 in half-hour steps
pub const CLOCK_SYMBOLS: [&str; 24] = [
    "🕛", // 0:00 / 12:00
    "🕧", // 0:30 / 12:30
    "🕐", // 1:00 / 13:00
    "🕜", // 1:30 / 13:30
    "🕑", // 2:00 / 14:00
    "🕝", // 2:30 / 14:30
    "🕒", // 3:00 / 15:00
    "🕞", // 3:30 / 15:30
    "🕓", // 4:00 / 16:00
    "🕟", // 4:30 / 16:30
    "🕔", // 5:00 / 17:00
    "🕠", // 5:30 / 17:30
    "🕕", // 6:00 / 18:00
    "🕡", // 6:30 / 18:30
    "🕖", // 7:00 / 19:00
    "🕢", // 7:30 / 19:30
    "🕗", // 8:00 / 20:00
    "🕣", // 8:30 / 20:30
    "🕘", // 9:00 / 21:00
    "🕤", // 9:30 / 21:30
    "🕙", // 10:00 / 22:00
    "🕥", // 10:30 / 22:30
    "🕚", // 11:00 / 23:00
    "🕦", // 11:30 / 23:30
];

// =============================================================================
// TYPES
// =============================================================================

/// Identity of one logging call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentity {
    pub sequence_number: u64,
    pub fingerprint: String,
}

/// Mutable per-thread counters
///
/// Owned by exactly one thread (or worker). Nothing here is shared, so no
/// locking is involved; the `grumble()` facade keeps one in a thread-local.
#[derive(Debug, Default, Clone)]
pub struct ThreadContext {
    next_sequence: u64,
    mood_index: usize,
}

impl ThreadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next sequence number and return its identity
    pub fn next_identity(&mut self) -> CallIdentity {
        let sequence_number = self.next_sequence;
        self.next_sequence += 1;

        CallIdentity {
            sequence_number,
            fingerprint: fingerprint(sequence_number),
        }
    }

    /// Return the current mood symbol and advance, wrapping after the last one
    pub fn next_mood_symbol(&mut self) -> &'static str {
        let symbol = MOOD_SYMBOLS[self.mood_index];
        self.mood_index = (self.mood_index + 1) % MOOD_SYMBOLS.len();
        symbol
    }

    /// Number of calls this context has identified so far
    pub fn calls_made(&self) -> u64 {
        self.next_sequence
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Lowercase hex SHA-1 of the decimal form of `sequence_number`
pub fn fingerprint(sequence_number: u64) -> String {
    let mut hasher = Sha1::new();
    hasher.update(sequence_number.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Clock face for a time of day
///
/// Hours fold onto a 12-hour dial; the second half of each hour moves to the
/// half-past face.
pub fn clock_symbol<T: Timelike>(time: &T) -> &'static str {
    let mut index = (time.hour() % 12) as usize * 2;
    if time.minute() >= 30 {
        index += 1;
    }
    CLOCK_SYMBOLS[index]
}
