//! The invoices page: controller, edit draft, and tax policy.

pub mod draft;
pub mod page;
pub mod tax;

pub use draft::{DraftField, EditDraft, ItemField};
pub use page::{InvoicePage, Modal, PageOptions, PageState};

/// Entity type of invoice list queries
pub const INVOICES: &str = "invoices";

/// Entity type of single invoice queries
pub const INVOICE: &str = "invoice";

impl crate::cache::Cacheable for crate::api::InvoiceRecord {
  fn cache_key(&self) -> &str {
    &self.id
  }

  fn entity_type() -> &'static str {
    INVOICES
  }
}
