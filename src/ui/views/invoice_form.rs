use crate::api::InvoiceRecord;
use crate::invoices::{DraftField, EditDraft, ItemField};
use crate::ui::components::{InputResult, KeyResult, TextInput};
use crate::ui::renderfns::{centered_rect, format_money, status_color};
use crate::ui::view::ShortcutInfo;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table};

/// One editable row of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormRow {
  Field(DraftField),
  Item(usize, ItemField),
}

impl FormRow {
  fn item_index(self) -> Option<usize> {
    match self {
      FormRow::Item(index, _) => Some(index),
      FormRow::Field(_) => None,
    }
  }
}

/// Rows in display order: scalar fields, then every field of every item
pub fn form_rows(draft: &EditDraft) -> Vec<FormRow> {
  let fields = DraftField::ALL.iter().map(|f| FormRow::Field(*f));
  let items = (0..draft.items().len())
    .flat_map(|i| ItemField::ALL.iter().map(move |f| FormRow::Item(i, *f)));
  fields.chain(items).collect()
}

/// What the list view should do after a form key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
  Save,
  Close,
}

/// Cursor and inline editor of the edit modal
#[derive(Debug, Clone, Default)]
pub struct InvoiceForm {
  cursor: usize,
  editor: Option<TextInput>,
}

impl InvoiceForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_editing(&self) -> bool {
    self.editor.is_some()
  }

  pub fn cursor(&self, draft: &EditDraft) -> Option<FormRow> {
    form_rows(draft).get(self.cursor).copied()
  }

  fn current_value(draft: &EditDraft, row: FormRow) -> String {
    match row {
      FormRow::Field(field) => draft.field(field).to_string(),
      FormRow::Item(index, field) => draft.item_field(index, field).unwrap_or_default(),
    }
  }

  fn apply(draft: &mut EditDraft, row: FormRow, value: &str) {
    match row {
      FormRow::Field(field) => draft.set_field(field, value),
      FormRow::Item(index, field) => draft.change_item(index, field, value),
    }
  }

  fn move_cursor(&mut self, delta: isize, len: usize) {
    if len == 0 {
      self.cursor = 0;
      return;
    }
    self.cursor = (self.cursor as isize + delta).rem_euclid(len as isize) as usize;
  }

  /// Commit the open editor, if any
  fn commit(&mut self, draft: &mut EditDraft) {
    if let (Some(editor), Some(row)) = (self.editor.take(), self.cursor(draft)) {
      Self::apply(draft, row, editor.value());
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent, draft: &mut EditDraft) -> KeyResult<FormEvent> {
    let save = key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL);

    if let Some(editor) = self.editor.as_mut() {
      if save {
        self.commit(draft);
        return KeyResult::Event(FormEvent::Save);
      }
      return match editor.handle_key(key) {
        InputResult::Submitted(_) => {
          self.commit(draft);
          KeyResult::Handled
        }
        InputResult::Cancelled => {
          self.editor = None;
          KeyResult::Handled
        }
        InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
      };
    }

    let len = form_rows(draft).len();
    match key.code {
      _ if save => return KeyResult::Event(FormEvent::Save),
      KeyCode::Char('s') => return KeyResult::Event(FormEvent::Save),
      KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => self.move_cursor(1, len),
      KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => self.move_cursor(-1, len),
      KeyCode::Enter | KeyCode::Char('i') => {
        if let Some(row) = self.cursor(draft) {
          self.editor = Some(TextInput::with_value(&Self::current_value(draft, row)));
        }
      }
      KeyCode::Char('a') => {
        draft.add_item();
        // Land on the new item's description
        let index = draft.items().len() - 1;
        let rows = form_rows(draft);
        if let Some(pos) = rows.iter().position(|r| *r == FormRow::Item(index, ItemField::Description)) {
          self.cursor = pos;
        }
      }
      KeyCode::Char('x') => {
        if let Some(index) = self.cursor(draft).and_then(FormRow::item_index) {
          draft.remove_item(index);
          let len = form_rows(draft).len();
          self.cursor = self.cursor.min(len.saturating_sub(1));
        }
      }
      KeyCode::Esc | KeyCode::Char('q') => return KeyResult::Event(FormEvent::Close),
      _ => return KeyResult::NotHandled,
    }
    KeyResult::Handled
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.is_editing() {
      return vec![
        ShortcutInfo::new("enter", "apply").with_priority(10),
        ShortcutInfo::new("esc", "discard").with_priority(20),
        ShortcutInfo::new("ctrl-s", "save").with_priority(30),
      ];
    }
    vec![
      ShortcutInfo::new("enter", "edit field").with_priority(10),
      ShortcutInfo::new("a", "add item").with_priority(20),
      ShortcutInfo::new("x", "remove item").with_priority(30),
      ShortcutInfo::new("s", "save").with_priority(40),
      ShortcutInfo::new("esc", "close").with_priority(90),
    ]
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, draft: &EditDraft) {
    let modal = centered_rect(70, area.height.saturating_sub(4), area);
    frame.render_widget(Clear, modal);

    let title = if draft.is_new() {
      " New invoice ".to_string()
    } else {
      format!(" Edit {} ", draft.record().invoice_number)
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(inner);

    let rows = form_rows(draft);
    let items: Vec<ListItem> = rows
      .iter()
      .enumerate()
      .map(|(pos, row)| {
        let label = match row {
          FormRow::Field(field) => format!("{:<14}", field.label()),
          FormRow::Item(index, field) => format!("  #{} {:<9}", index + 1, field.label()),
        };
        let value = match (&self.editor, pos == self.cursor) {
          (Some(editor), true) => {
            let mut spans = vec![Span::styled(label, Style::default().fg(Color::DarkGray))];
            spans.extend(editor.spans(Color::Yellow));
            Line::from(spans)
          }
          _ => Line::from(vec![
            Span::styled(label, Style::default().fg(Color::DarkGray)),
            Span::raw(Self::current_value(draft, *row)),
          ]),
        };
        ListItem::new(value)
      })
      .collect();

    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select((!rows.is_empty()).then_some(self.cursor));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    frame.render_widget(totals_line(draft.record()), chunks[1]);
  }
}

fn totals_line(record: &InvoiceRecord) -> Paragraph<'static> {
  let currency = record.currency.as_str();
  Paragraph::new(Line::from(vec![
    Span::styled("Subtotal ", Style::default().fg(Color::DarkGray)),
    Span::raw(format_money(record.subtotal, currency)),
    Span::styled("   Tax ", Style::default().fg(Color::DarkGray)),
    Span::raw(format_money(record.tax_total, currency)),
    Span::styled("   Total ", Style::default().fg(Color::DarkGray)),
    Span::styled(format_money(record.total, currency), Style::default().bold()),
  ]))
  .alignment(Alignment::Right)
}

/// Read-only modal for one invoice
pub fn render_record(frame: &mut Frame, area: Rect, record: &InvoiceRecord) {
  let modal = centered_rect(70, area.height.saturating_sub(4), area);
  frame.render_widget(Clear, modal);

  let block = Block::default()
    .title(format!(" {} ", record.invoice_number))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  let inner = block.inner(modal);
  frame.render_widget(block, modal);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(6), // Client and status
      Constraint::Min(3),    // Items
      Constraint::Length(1), // Totals
    ])
    .split(inner);

  let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
  let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
  let created = record
    .created_at
    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string());

  let header = vec![
    Line::from(vec![
      label("Client:  "),
      Span::styled(record.client_name.clone(), Style::default().bold()),
      Span::raw("  "),
      label("Status: "),
      Span::styled(record.status.clone(), Style::default().fg(status_color(&record.status))),
    ]),
    Line::from(vec![label("Address: "), Span::raw(or_dash(&record.client_address))]),
    Line::from(vec![
      label("Email:   "),
      Span::raw(or_dash(&record.client_email)),
      Span::raw("  "),
      label("Phone: "),
      Span::raw(or_dash(&record.client_phone)),
    ]),
    Line::from(vec![
      label("Quote:   "),
      Span::raw(or_dash(&record.quotation_number)),
      Span::raw("  "),
      label("Created: "),
      Span::raw(created),
    ]),
    Line::from(vec![label("PDF:     "), Span::raw(or_dash(&record.pdf_url))]),
  ];
  frame.render_widget(Paragraph::new(header), chunks[0]);

  let rows: Vec<Row> = record
    .items
    .iter()
    .map(|item| {
      Row::new(vec![
        Cell::from(item.description.clone()),
        Cell::from(format!("{}", item.quantity)),
        Cell::from(item.unit.clone().unwrap_or_default()),
        Cell::from(format!("{:.2}", item.unit_price)),
        Cell::from(format!("{:.2}", item.line_total())),
      ])
    })
    .collect();
  let table = Table::new(
    rows,
    [
      Constraint::Min(20),
      Constraint::Length(8),
      Constraint::Length(6),
      Constraint::Length(12),
      Constraint::Length(12),
    ],
  )
  .header(
    Row::new(vec!["Description", "Qty", "Unit", "Price", "Line total"])
      .style(Style::default().fg(Color::Cyan)),
  );
  frame.render_widget(table, chunks[1]);

  frame.render_widget(totals_line(record), chunks[2]);
}
