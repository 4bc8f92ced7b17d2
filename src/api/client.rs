use crate::api::api_types::{error_message, ApiInvoiceList};
use crate::api::error::ApiError;
use crate::api::pdf::{PdfExport, PdfExporter};
use crate::api::types::{InvoiceFilter, InvoicePatch, InvoiceRecord, NewInvoice};
use crate::config::Config;
use color_eyre::eyre::{self, eyre};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Invoice API client wrapper
#[derive(Clone)]
pub struct InvoiceClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
  exporter: PdfExporter,
}

impl InvoiceClient {
  pub fn new(config: &Config) -> eyre::Result<Self> {
    let token = Config::get_api_token();
    if token.is_none() {
      warn!("No API token set, requests will be sent unauthenticated");
    }

    let exporter = PdfExporter::new(config.exports.preview_dir()?, config.exports.download_dir()?);

    Self::with_parts(
      &config.api.url,
      token,
      Duration::from_secs(config.api.timeout_secs),
      exporter,
    )
    .map_err(|e| eyre!("Failed to create API client: {}", e))
  }

  /// Build a client from explicit parts
  pub fn with_parts(
    base_url: &str,
    token: Option<String>,
    timeout: Duration,
    exporter: PdfExporter,
  ) -> Result<Self, ApiError> {
    let mut base_url = Url::parse(base_url).map_err(|e| ApiError::Url(e.to_string()))?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::Url(format!("{} cannot be used as a base", base_url)));
    }
    // Keep path joins relative to the configured prefix
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(ApiError::Transport)?;

    Ok(Self {
      http,
      base_url,
      token,
      exporter,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Create an invoice
  pub async fn create(&self, payload: &NewInvoice) -> Result<InvoiceRecord, ApiError> {
    let request = self.request(Method::POST, &["invoices"]).json(payload);
    decode(self.send(request).await?).await
  }

  /// List invoices matching a filter
  pub async fn get_all(
    &self,
    filter: &InvoiceFilter,
  ) -> Result<Vec<InvoiceRecord>, ApiError> {
    let request = self
      .request(Method::GET, &["invoices"])
      .query(&filter.query_pairs());
    let list: ApiInvoiceList = decode(self.send(request).await?).await?;
    Ok(list.into_records())
  }

  /// Get a single invoice by id
  pub async fn get_one(&self, id: &str) -> Result<InvoiceRecord, ApiError> {
    let request = self.request(Method::GET, &["invoices", id]);
    decode(self.send(request).await?).await
  }

  /// Apply a partial update to an invoice
  pub async fn update(
    &self,
    id: &str,
    patch: &InvoicePatch,
  ) -> Result<InvoiceRecord, ApiError> {
    let request = self.request(Method::PATCH, &["invoices", id]).json(patch);
    decode(self.send(request).await?).await
  }

  /// Delete an invoice. Whatever the server sends back is ignored.
  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let request = self.request(Method::DELETE, &["invoices", id]);
    self.send(request).await?;
    Ok(())
  }

  /// Fetch the rendered PDF of an invoice.
  ///
  /// With `view_mode` the file is stored for preview only; otherwise it is
  /// saved once into the download directory. Both return a `file://` URL.
  pub async fn export_pdf(
    &self,
    id: &str,
    view_mode: bool,
  ) -> Result<PdfExport, ApiError> {
    let request = self
      .request(Method::GET, &["invoices", id, "pdf"])
      .query(&[("view", view_mode)]);
    let response = self.send(request).await?;
    let bytes = response.bytes().await.map_err(ApiError::Transport)?;

    self.exporter.save(id, &bytes, view_mode).await
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // Checked in with_parts: the base always has a path
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
    let request = self.http.request(method, self.endpoint(segments));
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(ApiError::Transport)?;
    let status = response.status();
    debug!(url = %response.url(), %status, "API response");

    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!(status = status.as_u16(), %message, "API request failed");
    Err(ApiError::Status {
      status: status.as_u16(),
      message,
    })
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
  response.json().await.map_err(ApiError::Decode)
}
