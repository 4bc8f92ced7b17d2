use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::time::Duration;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
const FRAME: Duration = Duration::from_millis(100);

/// Spinner glyph for the time spent loading so far
pub fn spinner_frame(elapsed: Duration) -> char {
  let step = (elapsed.as_millis() / FRAME.as_millis()) as usize;
  SPINNER[step % SPINNER.len()]
}

/// Placeholder shown while a page has nothing to render yet
pub fn draw_loading(frame: &mut Frame, area: Rect, label: &str, elapsed: Duration) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let text = format!("{} Loading {}...", spinner_frame(elapsed), label);
  let y = inner.y + inner.height / 2;
  let line_area = Rect::new(inner.x, y, inner.width, 1.min(inner.height));
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .style(Style::default().fg(Color::DarkGray));
  frame.render_widget(paragraph, line_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_spinner_cycles() {
    assert_eq!(spinner_frame(Duration::ZERO), '|');
    assert_eq!(spinner_frame(Duration::from_millis(150)), '/');
    assert_eq!(spinner_frame(Duration::from_millis(400)), '|');
  }
}
