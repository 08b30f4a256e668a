//! Bounded polling for the marker element, as a pure state machine.
//!
//! Each read of the page yields the marker's text (or nothing) and advances
//! the state. `PageLoaded` is sticky: once the marker has been seen, a later
//! miss still counts as "element not fully loaded" rather than "page not
//! loaded".

/// Lines the marker element holds once fully rendered.
pub const MARKER_LINE_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Marker not seen yet. `attempt` reads done so far.
    Polling { attempt: u32 },
    /// Marker seen, but never with its full line count.
    PageLoaded { attempt: u32 },
    /// Marker text with exactly [`MARKER_LINE_COUNT`] lines.
    ElementStable(Vec<String>),
    Exhausted(Exhaustion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    PageNotLoaded,
    ElementNotLoaded,
}

impl PollState {
    /// Initial state for a budget of `max_polls` reads.
    pub fn start(max_polls: u32) -> Self {
        if max_polls == 0 {
            Self::Exhausted(Exhaustion::PageNotLoaded)
        } else {
            Self::Polling { attempt: 0 }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ElementStable(_) | Self::Exhausted(_))
    }

    /// Fold one read result into the state. Terminal states absorb.
    pub fn advance(self, read: Option<&str>, max_polls: u32) -> Self {
        let (attempt, seen_before) = match self {
            Self::Polling { attempt } => (attempt, false),
            Self::PageLoaded { attempt } => (attempt, true),
            terminal => return terminal,
        };

        if let Some(text) = read {
            let lines: Vec<&str> = text.split('\n').collect();
            if lines.len() == MARKER_LINE_COUNT {
                return Self::ElementStable(lines.into_iter().map(String::from).collect());
            }
        }

        let loaded = seen_before || read.is_some();
        let attempt = attempt + 1;
        match (attempt >= max_polls, loaded) {
            (true, false) => Self::Exhausted(Exhaustion::PageNotLoaded),
            (true, true) => Self::Exhausted(Exhaustion::ElementNotLoaded),
            (false, false) => Self::Polling { attempt },
            (false, true) => Self::PageLoaded { attempt },
        }
    }
}
