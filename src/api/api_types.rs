//! Wire shapes that only exist to be decoded into domain types.

use serde::Deserialize;

use super::types::InvoiceRecord;

/// `GET /invoices` answers either with a bare array or with `{ "data": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiInvoiceList {
  Bare(Vec<InvoiceRecord>),
  Envelope { data: Vec<InvoiceRecord> },
}

impl ApiInvoiceList {
  pub fn into_records(self) -> Vec<InvoiceRecord> {
    match self {
      Self::Bare(records) => records,
      Self::Envelope { data } => data,
    }
  }
}

/// Error body as produced by the server's error middleware
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<serde_json::Value>,
  pub error: Option<serde_json::Value>,
}

/// Pull a human readable message out of an error response.
///
/// Prefers `message`, then `error`, then the status' canonical reason.
/// `message` may also be a list of validation messages, which are joined.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
  let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

  [parsed.message, parsed.error]
    .into_iter()
    .flatten()
    .find_map(|value| match value {
      serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
      serde_json::Value::Array(parts) => {
        let joined = parts
          .iter()
          .filter_map(|p| p.as_str())
          .collect::<Vec<_>>()
          .join(", ");
        (!joined.is_empty()).then_some(joined)
      }
      _ => None,
    })
    .unwrap_or_else(|| {
      status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    })
}
