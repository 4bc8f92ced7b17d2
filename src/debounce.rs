//! Debounced search term.
//!
//! Keystrokes land in an input buffer immediately; the buffer only becomes
//! the effective term once no new input arrived for the quiet period. Time is
//! passed in by the caller so the event loop tick drives promotion.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
  buffer: String,
  effective: String,
  quiet: Duration,
  last_input: Option<Instant>,
}

impl Debouncer {
  pub fn new(quiet: Duration) -> Self {
    Self {
      buffer: String::new(),
      effective: String::new(),
      quiet,
      last_input: None,
    }
  }

  /// What the user has typed so far
  pub fn buffer(&self) -> &str {
    &self.buffer
  }

  /// The term queries should use
  pub fn effective(&self) -> &str {
    &self.effective
  }

  /// Record new input; restarts the quiet period
  pub fn input(&mut self, value: impl Into<String>, now: Instant) {
    self.buffer = value.into();
    self.last_input = Some(now);
  }

  /// Promote the buffer if the quiet period has passed.
  ///
  /// Returns the new effective term when it changed.
  pub fn poll(&mut self, now: Instant) -> Option<&str> {
    let last = self.last_input?;
    if now.saturating_duration_since(last) < self.quiet {
      return None;
    }
    self.promote()
  }

  /// Promote the buffer right away (e.g. on Enter)
  pub fn flush(&mut self) -> Option<&str> {
    self.last_input?;
    self.promote()
  }

  fn promote(&mut self) -> Option<&str> {
    self.last_input = None;
    if self.buffer == self.effective {
      return None;
    }
    self.effective.clone_from(&self.buffer);
    Some(&self.effective)
  }
}
