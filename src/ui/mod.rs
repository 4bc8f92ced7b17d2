pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumb
    ])
    .split(frame.area());

  let shortcuts = if app.command_input().is_active() {
    vec![
      ShortcutInfo::new("tab", "next").with_priority(10),
      ShortcutInfo::new("enter", "run").with_priority(20),
      ShortcutInfo::new("esc", "cancel").with_priority(30),
    ]
  } else {
    app.view().shortcuts()
  };
  let context = app.view().context();
  renderfns::draw_header(frame, chunks[0], app.title(), context.as_deref(), &shortcuts);

  app.view_mut().render(frame, chunks[1]);
  app.command_input().render_overlay(frame, chunks[1]);
  app.toasts().render(frame, chunks[1]);

  renderfns::draw_footer(frame, chunks[2], &app.view().breadcrumb());
}

/// Keep a list selection inside `0..len`, selecting the first row when there
/// is something to select
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(usize::MAX));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
