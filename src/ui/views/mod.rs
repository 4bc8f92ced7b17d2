mod invoice_form;
mod invoice_list;

pub use invoice_list::InvoiceListView;
