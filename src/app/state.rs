use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub should_quit: bool,

    // Playback
    pub paused: bool,
    pub position_secs: f64,
    pub duration_secs: f64,

    // Translation
    pub translate_on: bool,
    /// Source texts with a request in flight.
    pub pending: HashSet<String>,
}

impl AppState {
    pub fn new(translate_on: bool) -> Self {
        Self {
            translate_on,
            ..Self::default()
        }
    }
}
