use crate::deeplink::DeepLink;
use crate::notify::Notification;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh, debounce, and query polling
  Tick,
  /// Toast raised by a background task
  Notify(Notification),
  /// Callback URL handed to the app from outside
  DeepLink(DeepLink),
}

/// Event handler that produces events from terminal input and a tick timer.
///
/// Background tasks push into the same channel through [`EventHandler::sender`].
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler reading the terminal at the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let handler = Self::detached();

    // crossterm polling blocks, so it gets its own thread
    let input_tx = handler.sender();
    tokio::task::spawn_blocking(move || loop {
      let event = if event::poll(tick_rate).unwrap_or(false) {
        match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
          _ => None,
        }
      } else {
        Some(Event::Tick)
      };

      if let Some(event) = event {
        if input_tx.send(event).is_err() {
          break;
        }
      }
    });

    handler
  }

  /// Handler fed only through [`EventHandler::sender`], without terminal input
  pub fn detached() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Sender for tasks that want to feed the event loop
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
