//! Timestamp-derived annotation ids

use crate::annotation::AnnotationId;

/// Hands out id bases derived from a millisecond clock reading.
///
/// A placement of `span` annotations uses ids `base..=base + span`. The next
/// base is always past the previous reservation, so two clicks within the
/// same millisecond (or an initial fan-out followed by a quick signature)
/// cannot collide.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last_reserved: Option<AnnotationId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a base for `span` extra ids at an explicit clock reading
    pub fn next_base_at(&mut self, now_ms: u64, span: u64) -> AnnotationId {
        let base = match self.last_reserved {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        self.last_reserved = Some(base + span);
        base
    }
}
