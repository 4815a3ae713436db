/// Counters owned by the loop controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Completed iterations
    pub iteration: u64,
    /// Full renders so far; drives the home-repositioning cadence
    pub redraw_count: u64,
    /// Iterations that only refreshed the timestamp
    pub suppressed: u64,
}

impl LoopState {
    /// Create a LoopState with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the iteration counter
    pub fn increment_iteration(&mut self) -> u64 {
        self.iteration += 1;
        self.iteration
    }

    /// Whether the next full render should move the cursor home
    ///
    /// True on full renders 0, N, 2N, ... for a cadence N > 0, never for 0.
    pub fn home_due(&self, refresh: u32) -> bool {
        refresh > 0 && self.redraw_count % u64::from(refresh) == 0
    }

    /// Record a full render
    pub fn record_full_render(&mut self) {
        self.redraw_count += 1;
    }

    /// Record a suppressed render
    pub fn record_suppressed(&mut self) {
        self.suppressed += 1;
    }

    /// Whether `limit` iterations have run
    pub fn is_done(&self, limit: Option<u32>) -> bool {
        limit.is_some_and(|max| self.iteration >= u64::from(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_cadence() {
        let mut state = LoopState::new();
        let mut homes = Vec::new();
        for i in 0..7 {
            if state.home_due(3) {
                homes.push(i);
            }
            state.record_full_render();
        }
        assert_eq!(homes, vec![0, 3, 6]);
    }

    #[test]
    fn test_refresh_zero_never_homes() {
        let mut state = LoopState::new();
        for _ in 0..5 {
            assert!(!state.home_due(0));
            state.record_full_render();
        }
    }

    #[test]
    fn test_refresh_one_always_homes() {
        let mut state = LoopState::new();
        for _ in 0..5 {
            assert!(state.home_due(1));
            state.record_full_render();
        }
    }

    #[test]
    fn test_is_done() {
        let mut state = LoopState::new();
        assert!(!state.is_done(Some(2)));
        state.increment_iteration();
        assert!(!state.is_done(Some(2)));
        assert_eq!(state.increment_iteration(), 2);
        assert!(state.is_done(Some(2)));
        assert!(!state.is_done(None));
    }

    #[test]
    fn test_unbounded_run_counts_past_u32() {
        let mut state = LoopState {
            iteration: u64::from(u32::MAX),
            ..LoopState::new()
        };
        assert_eq!(state.increment_iteration(), u64::from(u32::MAX) + 1);
        assert!(!state.is_done(None));
        assert!(state.is_done(Some(u32::MAX)));
    }
}
