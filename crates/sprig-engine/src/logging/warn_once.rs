use std::collections::HashSet;

/// Set of soft-error messages already reported.
///
/// Owned by a renderer instance rather than the process, so two renderers (or
/// two tests) never suppress each other's warnings.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: HashSet<String>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `message` at warn level the first time it is seen.
    ///
    /// Returns `true` when the message was emitted.
    pub fn warn(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.seen.contains(&message) {
            return false;
        }
        log::warn!("{message}");
        self.seen.insert(message);
        true
    }

    #[inline]
    pub fn has_warned(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
