//! How tax is derived when a draft's items change.

use std::fmt::Debug;
use std::sync::Arc;

use crate::api::LineItem;

/// Computes the tax total of a draft from its items
pub trait TaxPolicy: Debug + Send + Sync {
  fn tax_total(&self, subtotal: f64, items: &[LineItem]) -> f64;
}

/// Tax stays at zero while editing; the server remains the authority
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxPolicy for NoTax {
  fn tax_total(&self, _subtotal: f64, _items: &[LineItem]) -> f64 {
    0.0
  }
}

/// Single rate applied to the subtotal, rounded to cents
#[derive(Debug, Clone, Copy)]
pub struct FlatRate {
  rate: f64,
}

impl FlatRate {
  pub fn new(rate: f64) -> Self {
    Self {
      rate: if rate.is_finite() && rate > 0.0 { rate } else { 0.0 },
    }
  }
}

impl TaxPolicy for FlatRate {
  fn tax_total(&self, subtotal: f64, _items: &[LineItem]) -> f64 {
    (subtotal * self.rate * 100.0).round() / 100.0
  }
}

/// Policy for an optional configured rate
pub fn from_rate(rate: Option<f64>) -> Arc<dyn TaxPolicy> {
  match rate {
    Some(rate) if rate > 0.0 => Arc::new(FlatRate::new(rate)),
    _ => Arc::new(NoTax),
  }
}
