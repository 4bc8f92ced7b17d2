//! Domain types for invoices as exchanged with the procurement server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub quantity: f64,
  #[serde(default)]
  pub unit_price: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
}

impl LineItem {
  /// Zero-priced placeholder appended by "add item"
  pub fn placeholder() -> Self {
    Self::default()
  }

  pub fn line_total(&self) -> f64 {
    self.quantity * self.unit_price
  }
}

/// Full invoice as returned by the server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
  pub id: String,
  #[serde(default)]
  pub invoice_number: String,
  #[serde(default)]
  pub client_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client_address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client_email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client_phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quotation_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_invoice_id: Option<String>,
  /// Pricing rules as they were when the invoice was issued. Never edited.
  #[serde(default)]
  pub pricing_rule_snapshot: serde_json::Value,
  /// Company profile as it was when the invoice was issued. Never edited.
  #[serde(default)]
  pub company_profile_snapshot: serde_json::Value,
  #[serde(default)]
  pub items: Vec<LineItem>,
  #[serde(default)]
  pub subtotal: f64,
  #[serde(default)]
  pub tax_total: f64,
  #[serde(default)]
  pub total: f64,
  #[serde(default)]
  pub currency: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pdf_url: Option<String>,
  #[serde(default)]
  pub status: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
}

/// Filter for `GET /invoices`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
  pub search: Option<String>,
  pub status: Option<String>,
  pub limit: Option<u32>,
  pub offset: Option<u32>,
}

impl InvoiceFilter {
  /// Filter for a free-text search term. Blank terms mean "no search".
  pub fn search(term: &str) -> Self {
    let term = term.trim();
    Self {
      search: (!term.is_empty()).then(|| term.to_string()),
      ..Self::default()
    }
  }

  pub fn with_limit(mut self, limit: Option<u32>) -> Self {
    self.limit = limit;
    self
  }

  /// Query parameters, skipping anything unset or blank
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
      pairs.push(("search", search.to_string()));
    }
    if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
      pairs.push(("status", status.to_string()));
    }
    if let Some(limit) = self.limit {
      pairs.push(("limit", limit.to_string()));
    }
    if let Some(offset) = self.offset {
      pairs.push(("offset", offset.to_string()));
    }
    pairs
  }
}

/// Partial update body for `PATCH /invoices/{id}`.
///
/// Unset fields are left out of the JSON entirely so the server keeps its
/// current values. The optional client fields are doubly wrapped:
/// `Some(None)` is sent as `null` and clears the field on the server.
/// The historical snapshots are not part of the patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub invoice_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_address: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_email: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_phone: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quotation_number: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub items: Option<Vec<LineItem>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub subtotal: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tax_total: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub currency: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
}

impl InvoicePatch {
  /// Merge the set fields into a record, as the server would.
  pub fn apply_to(&self, record: &mut InvoiceRecord) {
    if let Some(v) = &self.invoice_number {
      record.invoice_number = v.clone();
    }
    if let Some(v) = &self.client_name {
      record.client_name = v.clone();
    }
    if let Some(v) = &self.client_address {
      record.client_address = v.clone();
    }
    if let Some(v) = &self.client_email {
      record.client_email = v.clone();
    }
    if let Some(v) = &self.client_phone {
      record.client_phone = v.clone();
    }
    if let Some(v) = &self.quotation_number {
      record.quotation_number = v.clone();
    }
    if let Some(v) = &self.items {
      record.items = v.clone();
    }
    if let Some(v) = self.subtotal {
      record.subtotal = v;
    }
    if let Some(v) = self.tax_total {
      record.tax_total = v;
    }
    if let Some(v) = self.total {
      record.total = v;
    }
    if let Some(v) = &self.currency {
      record.currency = v.clone();
    }
    if let Some(v) = &self.status {
      record.status = v.clone();
    }
  }
}

/// Body for `POST /invoices`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
  pub invoice_number: String,
  pub client_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub client_phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quotation_number: Option<String>,
  pub items: Vec<LineItem>,
  pub subtotal: f64,
  pub tax_total: f64,
  pub total: f64,
  pub currency: String,
}
