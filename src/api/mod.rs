//! REST client for the invoice endpoints of the procurement server.

pub mod api_types;
pub mod client;
pub mod error;
pub mod pdf;
pub mod types;

pub use client::InvoiceClient;
pub use pdf::{PdfExporter, PdfTarget};
pub use types::{InvoiceFilter, InvoicePatch, InvoiceRecord, LineItem, NewInvoice};
