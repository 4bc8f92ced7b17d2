use thiserror::Error;

/// Normalised failure of a call to the invoice API.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Network error: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("{message}")]
  Status { status: u16, message: String },

  #[error("Unexpected response from server: {0}")]
  Decode(#[source] reqwest::Error),

  #[error("Invalid API url: {0}")]
  Url(String),

  #[error("Could not save PDF: {0}")]
  Io(#[from] std::io::Error),
}

impl ApiError {
  /// HTTP status for errors the server answered with
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}
