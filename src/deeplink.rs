//! Callback URLs such as `procura://callback?status=success&provider=bank`.
//!
//! Third-party account linking finishes by opening one of these. Handling one
//! shows a notification and invalidates the linked accounts query.

use thiserror::Error;
use url::Url;

use crate::cache::{QueryCache, QueryKey};
use crate::notify::Notifier;

pub const SCHEME: &str = "procura";

/// Query key refreshed after every account-linking callback
pub const LINKED_ACCOUNTS: &str = "linked-accounts";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeepLinkError {
  #[error("invalid deep link: {0}")]
  Invalid(#[from] url::ParseError),
  #[error("unsupported deep link scheme '{0}'")]
  Scheme(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLink {
  pub status: Option<String>,
  pub provider: Option<String>,
  pub error: Option<String>,
}

impl DeepLink {
  pub fn parse(raw: &str) -> Result<Self, DeepLinkError> {
    let url = Url::parse(raw.trim())?;
    if url.scheme() != SCHEME {
      return Err(DeepLinkError::Scheme(url.scheme().to_string()));
    }

    let mut link = DeepLink::default();
    for (name, value) in url.query_pairs() {
      let value = (!value.is_empty()).then(|| value.into_owned());
      match name.as_ref() {
        "status" => link.status = value,
        "provider" => link.provider = value,
        "error" => link.error = value,
        _ => {}
      }
    }
    Ok(link)
  }

  fn provider_label(&self) -> &str {
    self.provider.as_deref().unwrap_or("Account")
  }

  /// Raise the matching notification and refresh linked accounts
  pub fn apply(&self, cache: &QueryCache, notifier: &Notifier) {
    if let Some(error) = &self.error {
      notifier.error(format!("{} linking failed: {}", self.provider_label(), error));
    } else if self.status.as_deref() == Some("success") {
      notifier.success(format!("{} linked", self.provider_label()));
    } else if let Some(status) = &self.status {
      notifier.info(format!("{} linking {}", self.provider_label(), status));
    }

    cache.invalidate_entity(LINKED_ACCOUNTS);
  }
}
