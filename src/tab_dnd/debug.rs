use std::collections::VecDeque;

/// Ring buffer of recent drag/session events, for copy-paste debugging.
///
/// Every line is also forwarded to the `log` facade at debug level, whether or not the buffer
/// itself is enabled.
#[derive(Debug)]
pub struct DebugLog {
    enabled: bool,
    capacity: usize,
    tick: u64,
    lines: VecDeque<String>,
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(false, 256)
    }
}

impl DebugLog {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity: capacity.clamp(1, 10_000),
            tick: 0,
            lines: VecDeque::new(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.lines.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advance the tick counter stamped on each line.
    pub fn begin_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn event(&mut self, scope: &str, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{scope}: {message}");
        if !self.enabled {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines
            .push_back(format!("[tick {}] {scope}: {message}", self.tick));
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn text(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
