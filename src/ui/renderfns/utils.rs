use ratatui::prelude::{Color, Constraint, Direction, Layout, Rect};

/// Truncate a string to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for an invoice status
pub fn status_color(status: &str) -> Color {
  match status.to_ascii_lowercase().as_str() {
    "paid" => Color::Green,
    "sent" | "issued" | "pending" => Color::Yellow,
    "overdue" => Color::Red,
    "void" | "cancelled" | "canceled" => Color::DarkGray,
    _ => Color::White,
  }
}

/// Amount with two decimals, followed by the currency when known
pub fn format_money(amount: f64, currency: &str) -> String {
  if currency.is_empty() {
    format!("{:.2}", amount)
  } else {
    format!("{:.2} {}", amount, currency)
  }
}

/// Rect of `percent_x` width and `height` rows centered in `area`
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
  let vertical = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Fill(1),
      Constraint::Length(height.min(area.height)),
      Constraint::Fill(1),
    ])
    .split(area);

  Layout::default()
    .direction(Direction::Horizontal)
    .constraints([
      Constraint::Percentage((100 - percent_x.min(100)) / 2),
      Constraint::Percentage(percent_x.min(100)),
      Constraint::Percentage((100 - percent_x.min(100)) / 2),
    ])
    .split(vertical[1])[1]
}
