//! Non-blocking user notifications (toasts).

use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub message: String,
  pub raised_at: Instant,
}

/// Handle background tasks use to raise notifications on the event loop
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Event>,
}

impl Notifier {
  pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
    Self { tx }
  }

  pub fn info(&self, message: impl Into<String>) {
    self.send(Level::Info, message.into());
  }

  pub fn success(&self, message: impl Into<String>) {
    self.send(Level::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.send(Level::Error, message.into());
  }

  fn send(&self, level: Level, message: String) {
    match level {
      Level::Error => warn!(%message, "Notify"),
      _ => info!(%message, "Notify"),
    }
    // The loop is gone during shutdown; nothing left to show it
    let _ = self.tx.send(Event::Notify(Notification {
      level,
      message,
      raised_at: Instant::now(),
    }));
  }
}
