use crate::api::InvoiceRecord;
use crate::invoices::{InvoicePage, Modal, PageState};
use crate::query::QueryState;
use crate::ui::components::{ConfirmDialog, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{draw_loading, format_money, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::invoice_form::{render_record, FormEvent, InvoiceForm};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::time::Instant;
use tracing::debug;

/// The invoices page: list, search, modals, and delete confirmation
pub struct InvoiceListView {
  page: InvoicePage,
  list_state: ListState,
  search: SearchInput,
  form: InvoiceForm,
  confirm: Option<ConfirmDialog>,
  loading_since: Instant,
}

impl InvoiceListView {
  pub fn new(mut page: InvoicePage) -> Self {
    // Start fetching immediately
    page.mount();

    Self {
      page,
      list_state: ListState::default(),
      search: SearchInput::new(),
      form: InvoiceForm::new(),
      confirm: None,
      loading_since: Instant::now(),
    }
  }

  fn selected(&self) -> Option<&InvoiceRecord> {
    self.list_state.selected().and_then(|i| self.page.invoices().get(i))
  }

  /// Id of the invoice the user is looking at: the open modal's, else the selection
  fn focused_id(&self) -> Option<String> {
    match self.page.modal() {
      Some(Modal::View(record)) => Some(record.id.clone()),
      Some(Modal::Edit(draft)) if !draft.is_new() => Some(draft.id().to_string()),
      Some(Modal::Edit(_)) => None,
      None => self.selected().map(|r| r.id.clone()),
    }
  }

  fn ask_delete(&mut self) {
    let Some(id) = self.focused_id() else {
      return;
    };
    let label = self
      .page
      .invoices()
      .iter()
      .find(|r| r.id == id)
      .map(|r| r.invoice_number.clone())
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| id.clone());
    self.page.request_delete(&id);
    self.confirm = Some(ConfirmDialog::new(format!("Delete invoice {}?", label)));
  }

  fn export(&mut self, view_mode: bool) {
    if let Some(id) = self.focused_id() {
      // Completion is reported through a notification
      drop(self.page.export_pdf(&id, view_mode));
    }
  }

  fn open_create(&mut self) {
    self.form = InvoiceForm::new();
    self.page.open_create();
  }

  fn handle_list_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.list_state.select_last(),
      KeyCode::Char('r') => self.page.refresh(),
      KeyCode::Char('n') => self.open_create(),
      KeyCode::Enter => {
        if let Some(record) = self.selected().cloned() {
          self.page.open_view(&record);
        }
      }
      KeyCode::Char('e') => {
        if let Some(record) = self.selected().cloned() {
          self.form = InvoiceForm::new();
          self.page.open_edit(&record);
        }
      }
      KeyCode::Char('D') | KeyCode::Char('x') | KeyCode::Delete => self.ask_delete(),
      KeyCode::Char('p') => self.export(true),
      KeyCode::Char('d') => self.export(false),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn handle_view_modal_key(&mut self, key: KeyEvent, record: InvoiceRecord) {
    match key.code {
      KeyCode::Char('e') => {
        self.form = InvoiceForm::new();
        self.page.open_edit(&record);
      }
      KeyCode::Char('D') | KeyCode::Char('x') | KeyCode::Delete => self.ask_delete(),
      KeyCode::Char('p') => self.export(true),
      KeyCode::Char('d') => self.export(false),
      KeyCode::Char('q') | KeyCode::Esc => self.page.close_modal(),
      _ => {}
    }
  }

  fn handle_edit_modal_key(&mut self, key: KeyEvent) {
    let Some(draft) = self.page.draft_mut() else {
      return;
    };
    match self.form.handle_key(key, draft) {
      KeyResult::Event(FormEvent::Save) => {
        debug!("Saving draft");
        drop(self.page.save());
      }
      KeyResult::Event(FormEvent::Close) => self.page.close_modal(),
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
  }

  fn title(&self) -> String {
    let term = self.page.search_term();
    let scope = if term.is_empty() {
      String::new()
    } else {
      format!(" /{}", term)
    };
    match self.page.query().state() {
      QueryState::Error(e) => format!(" Invoices{} (error: {}) ", scope, truncate(e, 60)),
      _ if self.page.query().is_fetching() => {
        format!(" Invoices{} ({}) refreshing... ", scope, self.page.invoices().len())
      }
      _ => format!(" Invoices{} ({}) ", scope, self.page.invoices().len()),
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.page.invoices().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = if self.page.query().is_error() {
        "Failed to load invoices. Press 'r' to retry."
      } else if self.page.search_term().is_empty() {
        "No invoices yet. Press 'n' to create one."
      } else {
        "No invoices match the search."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .page
      .invoices()
      .iter()
      .map(|invoice| {
        let created = invoice
          .created_at
          .map(|t| t.format("%Y-%m-%d").to_string())
          .unwrap_or_default();
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<14}", truncate(&invoice.invoice_number, 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", truncate(&invoice.status, 10)),
            Style::default().fg(status_color(&invoice.status)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<32}", truncate(&invoice.client_name, 32))),
          Span::raw(" "),
          Span::raw(format!("{:>16}", format_money(invoice.total, &invoice.currency))),
          Span::raw("  "),
          Span::styled(created, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for InvoiceListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Confirmation dialog is modal over everything
    if let Some(confirm) = &self.confirm {
      if let KeyResult::Event(yes) = confirm.handle_key(key) {
        self.confirm = None;
        if yes {
          drop(self.page.confirm_delete());
        } else {
          self.page.cancel_delete();
        }
      }
      return ViewAction::None;
    }

    match self.page.modal() {
      Some(Modal::View(record)) => {
        let record = record.clone();
        self.handle_view_modal_key(key, record);
        return ViewAction::None;
      }
      Some(Modal::Edit(_)) => {
        self.handle_edit_modal_key(key);
        return ViewAction::None;
      }
      None => {}
    }

    let current = self.page.search_buffer().to_string();
    match self.search.handle_key(key, &current) {
      KeyResult::Event(SearchEvent::Changed(value)) => {
        self.page.search_input(&value, Instant::now());
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => {
        self.page.search_submit();
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    self.handle_list_key(key)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    match self.page.state() {
      PageState::IdleList | PageState::Loading => {
        draw_loading(frame, area, "invoices", self.loading_since.elapsed());
      }
      _ => self.render_list(frame, area),
    }

    match self.page.modal() {
      Some(Modal::View(record)) => render_record(frame, area, record),
      Some(Modal::Edit(draft)) => self.form.render(frame, area, draft),
      None => {}
    }

    self.search.render_overlay(frame, area);

    if let Some(confirm) = &self.confirm {
      confirm.render(frame, area);
    }
  }

  fn breadcrumb(&self) -> Vec<String> {
    let mut crumbs = vec!["Invoices".to_string()];
    match self.page.modal() {
      Some(Modal::View(record)) => crumbs.push(record.invoice_number.clone()),
      Some(Modal::Edit(draft)) if draft.is_new() => crumbs.push("New".to_string()),
      Some(Modal::Edit(draft)) => crumbs.push(format!("Edit {}", draft.record().invoice_number)),
      None => {}
    }
    crumbs
  }

  fn context(&self) -> Option<String> {
    let term = self.page.search_term();
    (!term.is_empty()).then(|| format!("search: {}", term))
  }

  fn captures_input(&self) -> bool {
    let editing = matches!(self.page.modal(), Some(Modal::Edit(_))) && self.form.is_editing();
    self.search.is_active() || self.confirm.is_some() || editing
  }

  fn tick(&mut self, now: Instant) {
    if !matches!(self.page.state(), PageState::IdleList | PageState::Loading) {
      self.loading_since = now;
    }
    self.page.tick(now);
  }

  fn on_command(&mut self, command: &str) -> bool {
    match command {
      "invoices" => {
        self.confirm = None;
        self.page.cancel_delete();
        self.page.close_modal();
      }
      "new" => {
        self.confirm = None;
        self.page.cancel_delete();
        self.open_create();
      }
      "refresh" => self.page.refresh(),
      _ => return false,
    }
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.search.is_active() {
      return vec![
        ShortcutInfo::new("enter", "search now").with_priority(10),
        ShortcutInfo::new("esc", "clear").with_priority(20),
      ];
    }
    if self.confirm.is_some() {
      return vec![
        ShortcutInfo::new("y", "confirm").with_priority(10),
        ShortcutInfo::new("n", "cancel").with_priority(20),
      ];
    }
    match self.page.modal() {
      Some(Modal::Edit(_)) => self.form.shortcuts(),
      Some(Modal::View(_)) => vec![
        ShortcutInfo::new("e", "edit").with_priority(10),
        ShortcutInfo::new("p", "preview pdf").with_priority(20),
        ShortcutInfo::new("d", "download pdf").with_priority(30),
        ShortcutInfo::new("D", "delete").with_priority(40),
        ShortcutInfo::new("esc", "close").with_priority(90),
      ],
      None => vec![
        ShortcutInfo::new(":", "command").with_priority(10),
        ShortcutInfo::new("/", "search").with_priority(20),
        ShortcutInfo::new("n", "new").with_priority(30),
        ShortcutInfo::new("e", "edit").with_priority(40),
        ShortcutInfo::new("D", "delete").with_priority(50),
        ShortcutInfo::new("p/d", "pdf").with_priority(60),
        ShortcutInfo::new("r", "refresh").with_priority(70),
        ShortcutInfo::new("q", "quit").with_priority(90),
      ],
    }
  }
}
