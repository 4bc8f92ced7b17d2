use crate::cache::QueryCache;
use crate::event::{Event, EventHandler};
use crate::notify::Notifier;
use crate::ui;
use crate::ui::components::{CommandInput, KeyResult, Toasts};
use crate::ui::view::{View, ViewAction};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Main application state
pub struct App {
  /// Root view; the invoices page
  view: Box<dyn View>,

  /// `:` command prompt
  command_input: CommandInput,

  /// Notifications raised by background tasks
  toasts: Toasts,

  /// Header title
  title: String,

  /// Shared query cache, also reached by deep links
  cache: QueryCache,

  notifier: Notifier,

  events: EventHandler,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(
    title: String,
    view: Box<dyn View>,
    cache: QueryCache,
    notifier: Notifier,
    events: EventHandler,
  ) -> Self {
    Self {
      view,
      command_input: CommandInput::new(),
      toasts: Toasts::new(),
      title,
      cache,
      notifier,
      events,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    info!("Event loop started");
    while !self.should_quit() {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match self.events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    info!("Event loop finished");
    Ok(())
  }

  pub fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        let now = Instant::now();
        self.view.tick(now);
        self.toasts.prune(now);
      }
      Event::Notify(notification) => self.toasts.push(notification),
      Event::DeepLink(link) => {
        debug!(?link, "Deep link received");
        link.apply(&self.cache, &self.notifier);
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.command_input.is_active() || !self.view.captures_input() {
      match self.command_input.handle_key(key) {
        KeyResult::Event(command) => {
          self.execute_command(&command);
          return;
        }
        KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    match self.view.handle_key(key) {
      ViewAction::Pop => self.should_quit = true,
      ViewAction::None => {}
    }
  }

  fn execute_command(&mut self, command: &str) {
    match command {
      "quit" => self.should_quit = true,
      "" => {}
      other => {
        if !self.view.on_command(other) {
          warn!(command = other, "Unknown command");
          self.notifier.error(format!("Unknown command: {}", other));
        }
      }
    }
  }

  // Accessors for UI rendering
  pub fn view(&self) -> &dyn View {
    self.view.as_ref()
  }

  pub fn view_mut(&mut self) -> &mut dyn View {
    self.view.as_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn toasts(&self) -> &Toasts {
    &self.toasts
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deeplink::{DeepLink, LINKED_ACCOUNTS};
  use crate::cache::QueryKey;
  use crate::notify::Level;
  use std::cell::RefCell;
  use std::rc::Rc;
  use std::time::Duration;

  /// Records the commands it is sent; `i` starts text entry, Esc ends it
  struct StubView {
    commands: Rc<RefCell<Vec<String>>>,
    typing: bool,
    typed: String,
  }

  impl View for StubView {
    fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
      match key.code {
        KeyCode::Esc => self.typing = false,
        KeyCode::Char(c) if self.typing => self.typed.push(c),
        KeyCode::Char('i') => self.typing = true,
        KeyCode::Char('q') => return ViewAction::Pop,
        _ => {}
      }
      ViewAction::None
    }

    fn captures_input(&self) -> bool {
      self.typing
    }

    fn render(&mut self, _frame: &mut Frame, _area: Rect) {}

    fn breadcrumb(&self) -> Vec<String> {
      vec!["Stub".to_string()]
    }

    fn on_command(&mut self, command: &str) -> bool {
      self.commands.borrow_mut().push(command.to_string());
      command == "new"
    }
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn app() -> (App, Rc<RefCell<Vec<String>>>) {
    let commands = Rc::new(RefCell::new(Vec::new()));
    let events = EventHandler::detached();
    let notifier = Notifier::new(events.sender());
    let view = StubView {
      commands: Rc::clone(&commands),
      typing: false,
      typed: String::new(),
    };
    let app = App::new("test".into(), Box::new(view), QueryCache::new(), notifier, events);
    (app, commands)
  }

  fn type_command(app: &mut App, command: &str) {
    app.handle_event(Event::Key(key(KeyCode::Char(':'))));
    for c in command.chars() {
      app.handle_event(Event::Key(key(KeyCode::Char(c))));
    }
    app.handle_event(Event::Key(key(KeyCode::Enter)));
  }

  #[tokio::test]
  async fn test_commands_route_to_view() {
    let (mut app, commands) = app();
    type_command(&mut app, "new");
    assert_eq!(commands.borrow().as_slice(), ["new".to_string()]);
    assert!(!app.should_quit());

    type_command(&mut app, "quit");
    assert!(app.should_quit());
  }

  #[tokio::test]
  async fn test_unknown_command_raises_error_toast() {
    let (mut app, _commands) = app();
    type_command(&mut app, "bogus");

    let event = app.events.next().await.expect("event");
    let Event::Notify(notification) = event else {
      panic!("expected notification");
    };
    assert_eq!(notification.level, Level::Error);
    app.handle_event(Event::Notify(notification));
    assert_eq!(app.toasts().visible().len(), 1);
  }

  #[tokio::test]
  async fn test_colon_goes_to_view_while_typing() {
    let (mut app, commands) = app();
    for c in ['i', 'I', 'N', 'V', ':', '1'] {
      app.handle_event(Event::Key(key(KeyCode::Char(c))));
    }
    assert!(!app.command_input().is_active());
    assert!(commands.borrow().is_empty());

    app.handle_event(Event::Key(key(KeyCode::Esc)));
    app.handle_event(Event::Key(key(KeyCode::Char(':'))));
    assert!(app.command_input().is_active());
  }

  #[tokio::test]
  async fn test_pop_at_root_quits() {
    let (mut app, _commands) = app();
    app.handle_event(Event::Key(key(KeyCode::Char('q'))));
    assert!(app.should_quit());
  }

  #[tokio::test]
  async fn test_deep_link_invalidates_linked_accounts() {
    let (mut app, _commands) = app();
    let key = QueryKey::new(LINKED_ACCOUNTS);
    let ticket = app.cache.begin_fetch(&key);
    app.cache.complete_fetch(ticket, Ok(vec!["bank"]));
    assert!(!app.cache.state(&key).invalidated);

    let link = DeepLink::parse("procura://callback?status=success&provider=Bank").expect("parse");
    app.handle_event(Event::DeepLink(link));

    assert!(app.cache.state(&key).invalidated);
    let event = tokio::time::timeout(Duration::from_secs(1), app.events.next())
      .await
      .expect("timely")
      .expect("event");
    assert!(matches!(event, Event::Notify(n) if n.level == Level::Success));
  }
}
