use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::time::{Duration, Instant};

use crate::notify::{Level, Notification};

const MAX_VISIBLE: usize = 3;

/// How long a toast stays on screen. Errors linger longer.
fn lifetime(level: Level) -> Duration {
  match level {
    Level::Error => Duration::from_secs(8),
    _ => Duration::from_secs(4),
  }
}

fn level_color(level: Level) -> Color {
  match level {
    Level::Info => Color::Cyan,
    Level::Success => Color::Green,
    Level::Error => Color::Red,
  }
}

/// Stack of transient notifications, newest last
#[derive(Debug, Default)]
pub struct Toasts {
  items: Vec<Notification>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, notification: Notification) {
    self.items.push(notification);
  }

  /// Drop expired toasts. Returns true if any were removed.
  pub fn prune(&mut self, now: Instant) -> bool {
    let before = self.items.len();
    self
      .items
      .retain(|n| now.saturating_duration_since(n.raised_at) < lifetime(n.level));
    self.items.len() != before
  }

  pub fn visible(&self) -> &[Notification] {
    let start = self.items.len().saturating_sub(MAX_VISIBLE);
    &self.items[start..]
  }

  /// Render toasts stacked in the bottom-right corner of `area`
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width / 2).clamp(20.min(area.width), 60.min(area.width));
    let mut bottom = area.y + area.height;

    for toast in self.visible().iter().rev() {
      let text_width = width.saturating_sub(2).max(1) as usize;
      let lines = toast.message.chars().count().div_ceil(text_width).max(1) as u16;
      let height = (lines + 2).min(5);
      if bottom < area.y + height {
        break;
      }
      bottom -= height;
      let rect = Rect::new(area.x + area.width - width, bottom, width, height);

      frame.render_widget(Clear, rect);
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(level_color(toast.level)));
      let paragraph = Paragraph::new(toast.message.as_str())
        .block(block)
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, rect);
    }
  }
}
