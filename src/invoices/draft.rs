//! Edit draft of one invoice.
//!
//! The draft is a deep copy of the record it was opened for; nothing done
//! to it reaches the cache until it is saved.

use std::sync::Arc;

use super::tax::{NoTax, TaxPolicy};
use crate::api::{InvoicePatch, InvoiceRecord, LineItem, NewInvoice};

/// Scalar invoice fields editable from the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
  InvoiceNumber,
  ClientName,
  ClientAddress,
  ClientEmail,
  ClientPhone,
  QuotationNumber,
  Currency,
  Status,
}

impl DraftField {
  pub const ALL: [DraftField; 8] = [
    DraftField::InvoiceNumber,
    DraftField::ClientName,
    DraftField::ClientAddress,
    DraftField::ClientEmail,
    DraftField::ClientPhone,
    DraftField::QuotationNumber,
    DraftField::Currency,
    DraftField::Status,
  ];

  pub fn label(self) -> &'static str {
    match self {
      DraftField::InvoiceNumber => "Invoice #",
      DraftField::ClientName => "Client",
      DraftField::ClientAddress => "Address",
      DraftField::ClientEmail => "Email",
      DraftField::ClientPhone => "Phone",
      DraftField::QuotationNumber => "Quotation #",
      DraftField::Currency => "Currency",
      DraftField::Status => "Status",
    }
  }
}

/// Editable columns of a line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
  Description,
  Quantity,
  UnitPrice,
  Unit,
  Code,
}

impl ItemField {
  pub const ALL: [ItemField; 5] = [
    ItemField::Description,
    ItemField::Quantity,
    ItemField::UnitPrice,
    ItemField::Unit,
    ItemField::Code,
  ];

  pub fn label(self) -> &'static str {
    match self {
      ItemField::Description => "Description",
      ItemField::Quantity => "Qty",
      ItemField::UnitPrice => "Unit price",
      ItemField::Unit => "Unit",
      ItemField::Code => "Code",
    }
  }
}

/// Parse a numeric form value. Anything unparsable, negative, or not
/// finite becomes 0.
pub fn parse_amount(value: &str) -> f64 {
  match value.trim().replace(',', ".").parse::<f64>() {
    Ok(n) if n.is_finite() && n >= 0.0 => n,
    _ => 0.0,
  }
}

fn optional(value: &str) -> Option<String> {
  let value = value.trim();
  (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Clone)]
pub struct EditDraft {
  record: InvoiceRecord,
  tax: Arc<dyn TaxPolicy>,
}

impl EditDraft {
  /// Deep copy of `record`
  pub fn new(record: &InvoiceRecord, tax: Arc<dyn TaxPolicy>) -> Self {
    Self {
      record: record.clone(),
      tax,
    }
  }

  /// Empty draft for a new invoice
  pub fn blank(tax: Arc<dyn TaxPolicy>) -> Self {
    Self {
      record: InvoiceRecord::default(),
      tax,
    }
  }

  /// True for drafts of invoices the server does not know yet
  pub fn is_new(&self) -> bool {
    self.record.id.is_empty()
  }

  pub fn id(&self) -> &str {
    &self.record.id
  }

  pub fn record(&self) -> &InvoiceRecord {
    &self.record
  }

  pub fn items(&self) -> &[LineItem] {
    &self.record.items
  }

  /// Display value of a scalar field
  pub fn field(&self, field: DraftField) -> &str {
    let r = &self.record;
    match field {
      DraftField::InvoiceNumber => &r.invoice_number,
      DraftField::ClientName => &r.client_name,
      DraftField::ClientAddress => r.client_address.as_deref().unwrap_or(""),
      DraftField::ClientEmail => r.client_email.as_deref().unwrap_or(""),
      DraftField::ClientPhone => r.client_phone.as_deref().unwrap_or(""),
      DraftField::QuotationNumber => r.quotation_number.as_deref().unwrap_or(""),
      DraftField::Currency => &r.currency,
      DraftField::Status => &r.status,
    }
  }

  /// Display value of one item field; None if `index` is out of range
  pub fn item_field(&self, index: usize, field: ItemField) -> Option<String> {
    let item = self.record.items.get(index)?;
    Some(match field {
      ItemField::Description => item.description.clone(),
      ItemField::Quantity => item.quantity.to_string(),
      ItemField::UnitPrice => item.unit_price.to_string(),
      ItemField::Unit => item.unit.clone().unwrap_or_default(),
      ItemField::Code => item.code.clone().unwrap_or_default(),
    })
  }

  /// Replace one scalar field.
  ///
  /// Values are normalized on the way in: surrounding whitespace is trimmed,
  /// the currency code is uppercased, and an empty optional field becomes
  /// `None`.
  pub fn set_field(&mut self, field: DraftField, value: &str) {
    let r = &mut self.record;
    match field {
      DraftField::InvoiceNumber => r.invoice_number = value.trim().to_string(),
      DraftField::ClientName => r.client_name = value.trim().to_string(),
      DraftField::ClientAddress => r.client_address = optional(value),
      DraftField::ClientEmail => r.client_email = optional(value),
      DraftField::ClientPhone => r.client_phone = optional(value),
      DraftField::QuotationNumber => r.quotation_number = optional(value),
      DraftField::Currency => r.currency = value.trim().to_uppercase(),
      DraftField::Status => r.status = value.trim().to_string(),
    }
  }

  /// Replace one field of the item at `index` and recompute totals.
  /// Out of range indexes are ignored.
  pub fn change_item(&mut self, index: usize, field: ItemField, value: &str) {
    let Some(item) = self.record.items.get_mut(index) else {
      return;
    };
    match field {
      ItemField::Description => item.description = value.to_string(),
      ItemField::Quantity => item.quantity = parse_amount(value),
      ItemField::UnitPrice => item.unit_price = parse_amount(value),
      ItemField::Unit => item.unit = optional(value),
      ItemField::Code => item.code = optional(value),
    }
    self.recompute();
  }

  /// Append a zero-priced placeholder item. Totals are unchanged until the
  /// placeholder is edited.
  pub fn add_item(&mut self) {
    self.record.items.push(LineItem::placeholder());
  }

  /// Drop the item at `index` and recompute totals
  pub fn remove_item(&mut self, index: usize) {
    if index < self.record.items.len() {
      self.record.items.remove(index);
      self.recompute();
    }
  }

  /// subtotal = Σ quantity × unit price; total = subtotal + tax
  pub fn recompute(&mut self) {
    let r = &mut self.record;
    r.subtotal = r.items.iter().map(LineItem::line_total).sum();
    r.tax_total = self.tax.tax_total(r.subtotal, &r.items);
    r.total = r.subtotal + r.tax_total;
  }

  /// Everything the form can change, as a partial update. Optional fields
  /// are always sent so a cleared field reaches the server as `null`.
  pub fn to_patch(&self) -> InvoicePatch {
    let r = &self.record;
    InvoicePatch {
      invoice_number: Some(r.invoice_number.clone()),
      client_name: Some(r.client_name.clone()),
      client_address: Some(r.client_address.clone()),
      client_email: Some(r.client_email.clone()),
      client_phone: Some(r.client_phone.clone()),
      quotation_number: Some(r.quotation_number.clone()),
      items: Some(r.items.clone()),
      subtotal: Some(r.subtotal),
      tax_total: Some(r.tax_total),
      total: Some(r.total),
      currency: Some(r.currency.clone()),
      status: Some(r.status.clone()),
    }
  }

  /// Create payload for a new invoice
  pub fn to_new_invoice(&self) -> NewInvoice {
    let r = &self.record;
    NewInvoice {
      invoice_number: r.invoice_number.clone(),
      client_name: r.client_name.clone(),
      client_address: r.client_address.clone(),
      client_email: r.client_email.clone(),
      client_phone: r.client_phone.clone(),
      quotation_number: r.quotation_number.clone(),
      items: r.items.clone(),
      subtotal: r.subtotal,
      tax_total: r.tax_total,
      total: r.total,
      currency: r.currency.clone(),
    }
  }
}

impl Default for EditDraft {
  fn default() -> Self {
    Self::blank(Arc::new(NoTax))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::invoices::tax::FlatRate;

  fn item(qty: f64, price: f64) -> LineItem {
    LineItem {
      description: format!("{qty}x{price}"),
      quantity: qty,
      unit_price: price,
      ..Default::default()
    }
  }

  fn record(items: Vec<LineItem>) -> InvoiceRecord {
    let subtotal = items.iter().map(LineItem::line_total).sum();
    InvoiceRecord {
      id: "1".into(),
      items,
      subtotal,
      total: subtotal,
      ..Default::default()
    }
  }

  fn no_tax() -> Arc<dyn TaxPolicy> {
    Arc::new(NoTax)
  }

  fn assert_totals_consistent(draft: &EditDraft) {
    let r = draft.record();
    let expected: f64 = r.items.iter().map(|i| i.quantity * i.unit_price).sum();
    assert!((r.subtotal - expected).abs() < 1e-9, "subtotal {} != {}", r.subtotal, expected);
    assert!((r.total - (r.subtotal + r.tax_total)).abs() < 1e-9);
  }

  #[test]
  fn test_price_edit_recomputes_totals() {
    let mut draft = EditDraft::new(&record(vec![item(2.0, 10.0)]), no_tax());

    draft.change_item(0, ItemField::UnitPrice, "15");

    assert_eq!(draft.record().subtotal, 30.0);
    assert_eq!(draft.record().total, 30.0);
  }

  #[test]
  fn test_draft_is_independent_of_source() {
    let source = record(vec![item(1.0, 5.0)]);
    let mut draft = EditDraft::new(&source, no_tax());

    draft.change_item(0, ItemField::Quantity, "4");
    draft.set_field(DraftField::ClientName, "Changed");

    assert_eq!(source.items[0].quantity, 1.0);
    assert_eq!(source.client_name, "");
    assert_eq!(draft.record().subtotal, 20.0);
  }

  #[test]
  fn test_set_field_touches_only_that_field() {
    let mut source = record(vec![item(1.0, 1.0)]);
    source.client_email = Some("old@example.com".into());
    let mut draft = EditDraft::new(&source, no_tax());

    draft.set_field(DraftField::ClientPhone, " 555-0100 ");

    let mut expected = source.clone();
    expected.client_phone = Some("555-0100".into());
    assert_eq!(draft.record(), &expected);

    draft.set_field(DraftField::ClientEmail, "");
    assert_eq!(draft.record().client_email, None);
  }

  #[test]
  fn test_cleared_field_reaches_patch_and_cache() {
    let mut source = record(vec![item(1.0, 1.0)]);
    source.client_email = Some("old@example.com".into());
    let mut draft = EditDraft::new(&source, no_tax());

    draft.set_field(DraftField::ClientEmail, "");
    let patch = draft.to_patch();

    let value = serde_json::to_value(&patch).expect("encode");
    assert_eq!(value["clientEmail"], serde_json::Value::Null);
    assert!(value.get("clientPhone").is_some());

    let mut cached = source.clone();
    patch.apply_to(&mut cached);
    assert_eq!(cached.client_email, None);
  }

  #[test]
  fn test_set_field_normalizes_input() {
    let mut draft = EditDraft::new(&record(vec![]), no_tax());

    draft.set_field(DraftField::Currency, " eur ");
    draft.set_field(DraftField::QuotationNumber, "   ");

    assert_eq!(draft.field(DraftField::Currency), "EUR");
    assert_eq!(draft.record().quotation_number, None);
  }

  #[test]
  fn test_unparsable_numbers_become_zero() {
    let mut draft = EditDraft::new(&record(vec![item(2.0, 10.0)]), no_tax());

    draft.change_item(0, ItemField::Quantity, "two");
    assert_eq!(draft.items()[0].quantity, 0.0);
    assert_eq!(draft.record().total, 0.0);

    draft.change_item(0, ItemField::Quantity, "-3");
    assert_eq!(draft.items()[0].quantity, 0.0);

    draft.change_item(0, ItemField::Quantity, "1,5");
    assert_eq!(draft.items()[0].quantity, 1.5);
    assert_totals_consistent(&draft);
  }

  #[test]
  fn test_out_of_range_item_edit_is_noop() {
    let source = record(vec![item(2.0, 10.0)]);
    let mut draft = EditDraft::new(&source, no_tax());

    draft.change_item(5, ItemField::UnitPrice, "99");
    draft.remove_item(5);

    assert_eq!(draft.record(), &source);
  }

  #[test]
  fn test_add_item_does_not_recompute() {
    let mut source = record(vec![item(2.0, 10.0)]);
    // Server total that disagrees with the items stays until an edit
    source.total = 25.0;
    let mut draft = EditDraft::new(&source, no_tax());

    draft.add_item();

    assert_eq!(draft.items().len(), 2);
    assert_eq!(draft.items()[1], LineItem::placeholder());
    assert_eq!(draft.record().total, 25.0);

    draft.change_item(1, ItemField::Quantity, "1");
    assert_eq!(draft.record().total, 20.0);
  }

  #[test]
  fn test_remove_item_preserves_order() {
    let items = vec![item(1.0, 1.0), item(2.0, 2.0), item(3.0, 3.0), item(4.0, 4.0)];
    let mut draft = EditDraft::new(&record(items.clone()), no_tax());

    draft.remove_item(1);

    assert_eq!(
      draft.items(),
      &[items[0].clone(), items[2].clone(), items[3].clone()]
    );
    assert_eq!(draft.record().subtotal, 1.0 + 9.0 + 16.0);
    assert_totals_consistent(&draft);
  }

  #[test]
  fn test_totals_hold_over_edit_sequence() {
    let mut draft = EditDraft::new(&record(vec![item(1.0, 2.0)]), Arc::new(FlatRate::new(0.1)));
    let steps: &[(&str, usize, ItemField, &str)] = &[
      ("add", 0, ItemField::Quantity, ""),
      ("edit", 1, ItemField::Quantity, "3"),
      ("edit", 1, ItemField::UnitPrice, "7.25"),
      ("add", 0, ItemField::Quantity, ""),
      ("edit", 2, ItemField::UnitPrice, "100"),
      ("edit", 2, ItemField::Quantity, "0.5"),
      ("remove", 0, ItemField::Quantity, ""),
      ("edit", 0, ItemField::UnitPrice, "abc"),
    ];

    for (op, index, field, value) in steps {
      match *op {
        "add" => draft.add_item(),
        "edit" => {
          draft.change_item(*index, *field, value);
          assert_totals_consistent(&draft);
        }
        _ => {
          draft.remove_item(*index);
          assert_totals_consistent(&draft);
        }
      }
    }

    assert_eq!(draft.items().len(), 2);
    assert_eq!(draft.record().subtotal, 50.0);
    assert_eq!(draft.record().tax_total, 5.0);
    assert_eq!(draft.record().total, 55.0);
  }

  #[test]
  fn test_patch_carries_draft_values() {
    let mut draft = EditDraft::new(&record(vec![item(2.0, 10.0)]), no_tax());
    draft.set_field(DraftField::Status, "sent");
    draft.change_item(0, ItemField::UnitPrice, "15");

    let patch = draft.to_patch();

    assert_eq!(patch.status.as_deref(), Some("sent"));
    assert_eq!(patch.total, Some(30.0));
    assert_eq!(patch.items.as_ref().map(Vec::len), Some(1));
  }

  #[test]
  fn test_blank_draft_is_new() {
    let mut draft = EditDraft::default();
    assert!(draft.is_new());
    draft.set_field(DraftField::Currency, "eur");
    draft.set_field(DraftField::ClientName, "Umbrella");
    let payload = draft.to_new_invoice();
    assert_eq!(payload.currency, "EUR");
    assert_eq!(payload.client_name, "Umbrella");
  }
}
