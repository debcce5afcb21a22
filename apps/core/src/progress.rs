/// Debounced "is this taking a while" signal, scoped to one generation.
///
/// The engine arms a delayed check when a generation starts; if the check
/// fires while that generation is still current and still running, the
/// visible flag flips to busy. Draining the current generation clears it.
/// Events from superseded generations are no-ops, so a slow abandoned query
/// can never flash the indicator after a fast new one has resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    current: u64,
    running: bool,
    busy: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            current: 0,
            running: false,
            busy: false,
        }
    }
}

impl ProgressState {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// A new generation supersedes whatever was running. The indicator is
    /// reset immediately; it only comes back if the delayed check fires.
    pub fn generation_started(&mut self, generation: u64) {
        self.current = generation;
        self.running = true;
        self.busy = false;
    }

    /// No generation in flight (input cleared).
    pub fn idle(&mut self) {
        self.running = false;
        self.busy = false;
    }

    /// The one-shot delay elapsed for `generation`. Returns true if the
    /// visible flag changed.
    pub fn delay_elapsed(&mut self, generation: u64) -> bool {
        if generation != self.current || !self.running || self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    /// Every eligible invocation for `generation` completed or was cancelled.
    /// Returns true if the visible flag changed.
    pub fn drained(&mut self, generation: u64) -> bool {
        if generation != self.current {
            return false;
        }
        self.running = false;
        if self.busy {
            self.busy = false;
            return true;
        }
        false
    }
}
