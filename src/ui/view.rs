use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::time::Instant;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
  /// No action needed
  None,
  /// Leave the view (quits at the root)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, edit, confirmation) and
/// return actions for the App to execute: App → View → Components.
///
/// Views that load data asynchronously hold a Query<T> and poll it in tick().
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Breadcrumb labels, outermost first
  fn breadcrumb(&self) -> Vec<String>;

  /// Extra context for the header, e.g. the active search
  fn context(&self) -> Option<String> {
    None
  }

  /// Called on each tick to drive timers and poll async queries
  fn tick(&mut self, _now: Instant) {}

  /// True while the view is taking free text (search box, field editor, or
  /// a dialog), so `:` belongs to the view rather than the command prompt
  fn captures_input(&self) -> bool {
    false
  }

  /// Run a `:` command aimed at this view. Returns false if unknown.
  fn on_command(&mut self, _command: &str) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
