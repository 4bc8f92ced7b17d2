//! Controller of the invoices page, independent of rendering.
//!
//! States: `IdleList → Loading → ListLoaded`, and from a loaded list either
//! `ModalView` or `ModalEdit`. Mutations go through the cache optimistically
//! and are reconciled with the server once they settle.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::draft::EditDraft;
use super::tax::TaxPolicy;
use super::{INVOICE, INVOICES};
use crate::api::{InvoiceClient, InvoiceFilter, InvoiceRecord, PdfTarget};
use crate::cache::{modify_by_key, remove_by_key, Cacheable, OptimisticUpdate, QueryCache, QueryKey};
use crate::debounce::Debouncer;
use crate::notify::Notifier;
use crate::query::{Query, QueryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
  IdleList,
  Loading,
  ListLoaded,
  ModalView,
  ModalEdit,
}

/// Open modal and what it holds
#[derive(Debug, Clone)]
pub enum Modal {
  /// Read-only snapshot of the selected record
  View(InvoiceRecord),
  /// Draft being edited; blank drafts create a new invoice on save
  Edit(EditDraft),
}

impl Modal {
  fn invoice_id(&self) -> &str {
    match self {
      Modal::View(record) => &record.id,
      Modal::Edit(draft) => draft.id(),
    }
  }
}

/// Page tunables
#[derive(Debug, Clone)]
pub struct PageOptions {
  pub debounce: Duration,
  pub page_size: Option<u32>,
  pub tax: Arc<dyn TaxPolicy>,
}

pub fn list_key(term: &str) -> QueryKey {
  QueryKey::new(InvoiceRecord::entity_type()).with_filter(term)
}

/// Key of the full record shown in the view modal
pub fn detail_key(id: &str) -> QueryKey {
  QueryKey::new(INVOICE).with_filter(id)
}

pub struct InvoicePage {
  client: InvoiceClient,
  cache: QueryCache,
  notifier: Notifier,
  query: Query<Vec<InvoiceRecord>>,
  search: Debouncer,
  modal: Option<Modal>,
  pending_delete: Option<String>,
  /// Detail entry version when the view modal opened; older data is stale
  detail_since: u64,
  tax: Arc<dyn TaxPolicy>,
}

impl InvoicePage {
  pub fn new(client: InvoiceClient, cache: QueryCache, notifier: Notifier, options: PageOptions) -> Self {
    let fetch_client = client.clone();
    let page_size = options.page_size;
    let query = Query::new(cache.clone(), list_key(""), move |key: &QueryKey| {
      let client = fetch_client.clone();
      let filter = InvoiceFilter::search(key.filter()).with_limit(page_size);
      async move { client.get_all(&filter).await.map_err(|e| e.to_string()) }
    });

    Self {
      client,
      cache,
      notifier,
      query,
      search: Debouncer::new(options.debounce),
      modal: None,
      pending_delete: None,
      detail_since: 0,
      tax: options.tax,
    }
  }

  /// First read of the list
  pub fn mount(&mut self) {
    self.query.fetch();
  }

  pub fn state(&self) -> PageState {
    match &self.modal {
      Some(Modal::View(_)) => PageState::ModalView,
      Some(Modal::Edit(_)) => PageState::ModalEdit,
      None => match self.query.state() {
        QueryState::Idle if self.query.data().is_none() => PageState::IdleList,
        _ if self.query.is_loading() => PageState::Loading,
        _ => PageState::ListLoaded,
      },
    }
  }

  pub fn key(&self) -> &QueryKey {
    self.query.key()
  }

  pub fn query(&self) -> &Query<Vec<InvoiceRecord>> {
    &self.query
  }

  pub fn invoices(&self) -> &[InvoiceRecord] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn modal(&self) -> Option<&Modal> {
    self.modal.as_ref()
  }

  pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
    match &mut self.modal {
      Some(Modal::Edit(draft)) => Some(draft),
      _ => None,
    }
  }

  pub fn search_buffer(&self) -> &str {
    self.search.buffer()
  }

  pub fn search_term(&self) -> &str {
    self.search.effective()
  }

  /// Drive timers and sync with the cache. Returns true if anything changed.
  pub fn tick(&mut self, now: Instant) -> bool {
    let mut changed = false;
    if let Some(term) = self.search.poll(now) {
      let key = list_key(term);
      self.query.set_key(key);
      changed = true;
    }
    changed |= self.sync_detail();
    self.query.poll() || changed
  }

  /// Swap the view modal's snapshot for the full record once it arrives
  fn sync_detail(&mut self) -> bool {
    let Some(Modal::View(shown)) = &mut self.modal else {
      return false;
    };
    let key = detail_key(&shown.id);
    if self.cache.state(&key).version <= self.detail_since {
      return false;
    }
    match self.cache.get_query_data::<InvoiceRecord>(&key) {
      Some(fresh) if fresh != *shown => {
        *shown = fresh;
        true
      }
      _ => false,
    }
  }

  /// A keystroke changed the search box
  pub fn search_input(&mut self, value: &str, now: Instant) {
    self.search.input(value, now);
  }

  /// Apply the search box right away
  pub fn search_submit(&mut self) {
    if let Some(term) = self.search.flush() {
      let key = list_key(term);
      self.query.set_key(key);
    }
  }

  /// Refetch the current list
  pub fn refresh(&mut self) {
    self.cache.invalidate(self.query.key());
  }

  /// Show `record` right away and load its full version in the background
  pub fn open_view(&mut self, record: &InvoiceRecord) -> JoinHandle<()> {
    self.modal = Some(Modal::View(record.clone()));
    let key = detail_key(&record.id);
    self.detail_since = self.cache.state(&key).version;

    let client = self.client.clone();
    let cache = self.cache.clone();
    let id = record.id.clone();
    tokio::spawn(async move {
      match client.get_one(&id).await {
        Ok(fresh) => cache.set_query_data(&key, &fresh),
        Err(e) => warn!(%id, error = %e, "Failed to load invoice"),
      }
    })
  }

  pub fn open_edit(&mut self, record: &InvoiceRecord) {
    self.modal = Some(Modal::Edit(EditDraft::new(record, Arc::clone(&self.tax))));
  }

  pub fn open_create(&mut self) {
    self.modal = Some(Modal::Edit(EditDraft::blank(Arc::clone(&self.tax))));
  }

  /// Close any modal, discarding an unsaved draft
  pub fn close_modal(&mut self) {
    self.modal = None;
  }

  /// Ask for confirmation before deleting
  pub fn request_delete(&mut self, id: &str) {
    self.pending_delete = Some(id.to_string());
  }

  pub fn pending_delete(&self) -> Option<&str> {
    self.pending_delete.as_deref()
  }

  pub fn cancel_delete(&mut self) {
    self.pending_delete = None;
  }

  /// Run the delete that was asked for, if any
  pub fn confirm_delete(&mut self) -> Option<JoinHandle<()>> {
    let id = self.pending_delete.take()?;
    Some(self.delete(&id))
  }

  /// Optimistically delete an invoice.
  ///
  /// The record disappears from the cached list and any modal showing it
  /// closes before the request is sent. A failed request puts the list back
  /// as it was. The list is refetched either way.
  pub fn delete(&mut self, id: &str) -> JoinHandle<()> {
    let key = self.query.key().clone();
    let tx = OptimisticUpdate::begin(&self.cache, &key, |list: &mut Vec<InvoiceRecord>| {
      remove_by_key(list, id);
    });
    if self.modal.as_ref().is_some_and(|m| m.invoice_id() == id) {
      self.modal = None;
    }
    self.query.poll();

    info!(%id, %key, "Deleting invoice");
    let client = self.client.clone();
    let notifier = self.notifier.clone();
    let id = id.to_string();
    tokio::spawn(async move {
      match tx.settle(client.delete(&id)).await {
        Ok(()) => notifier.success("Invoice deleted"),
        Err(e) => notifier.error(format!("Failed to delete invoice: {}", e)),
      }
    })
  }

  /// Save the open draft. Existing invoices are updated optimistically; new
  /// ones are created and then picked up by the refetch.
  pub fn save(&mut self) -> Option<JoinHandle<()>> {
    let draft = match self.modal.take() {
      Some(Modal::Edit(draft)) => draft,
      other => {
        self.modal = other;
        return None;
      }
    };

    if draft.is_new() {
      return Some(self.create(&draft));
    }

    let key = self.query.key().clone();
    let id = draft.id().to_string();
    let patch = draft.to_patch();
    let tx = OptimisticUpdate::begin(&self.cache, &key, |list: &mut Vec<InvoiceRecord>| {
      modify_by_key(list, &id, |record| patch.apply_to(record));
    });
    self.query.poll();

    info!(%id, %key, "Updating invoice");
    let client = self.client.clone();
    let notifier = self.notifier.clone();
    Some(tokio::spawn(async move {
      match tx.settle(client.update(&id, &patch)).await {
        Ok(_) => notifier.success("Invoice updated"),
        Err(e) => notifier.error(format!("Failed to update invoice: {}", e)),
      }
    }))
  }

  fn create(&mut self, draft: &EditDraft) -> JoinHandle<()> {
    let payload = draft.to_new_invoice();
    let client = self.client.clone();
    let cache = self.cache.clone();
    let notifier = self.notifier.clone();

    debug!("Creating invoice");
    tokio::spawn(async move {
      match client.create(&payload).await {
        Ok(record) => notifier.success(format!("Invoice {} created", record.invoice_number)),
        Err(e) => notifier.error(format!("Failed to create invoice: {}", e)),
      }
      cache.invalidate_entity(INVOICES);
    })
  }

  /// Fetch the PDF of an invoice, for preview (`view_mode`) or download
  pub fn export_pdf(&self, id: &str, view_mode: bool) -> JoinHandle<()> {
    let client = self.client.clone();
    let notifier = self.notifier.clone();
    let id = id.to_string();

    tokio::spawn(async move {
      match client.export_pdf(&id, view_mode).await {
        Ok(export) => match export.target {
          PdfTarget::Preview => notifier.info(format!("Preview ready: {}", export.url)),
          PdfTarget::Download => notifier.success(format!("Saved to {}", export.path.display())),
        },
        Err(e) => notifier.error(format!("Failed to export PDF: {}", e)),
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{LineItem, PdfExporter};
  use crate::event::Event;
  use crate::invoices::draft::{DraftField, ItemField};
  use crate::invoices::tax::NoTax;
  use crate::notify::{Level, Notification};
  use tokio::sync::mpsc;
  use wiremock::matchers::{body_partial_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  struct Harness {
    server: MockServer,
    cache: QueryCache,
    page: InvoicePage,
    events: mpsc::UnboundedReceiver<Event>,
    _dirs: tempfile::TempDir,
  }

  fn record(id: &str) -> InvoiceRecord {
    InvoiceRecord {
      id: id.into(),
      invoice_number: format!("INV-{id}"),
      client_name: format!("Client {id}"),
      items: vec![LineItem {
        description: "Widgets".into(),
        quantity: 2.0,
        unit_price: 10.0,
        ..Default::default()
      }],
      subtotal: 20.0,
      total: 20.0,
      ..Default::default()
    }
  }

  fn ids(records: &[InvoiceRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
  }

  async fn harness() -> Harness {
    let server = MockServer::start().await;
    let dirs = tempfile::tempdir().expect("tempdir");
    let client = InvoiceClient::with_parts(
      &server.uri(),
      None,
      Duration::from_secs(5),
      PdfExporter::new(dirs.path().join("preview"), dirs.path().join("downloads")),
    )
    .expect("client");
    let cache = QueryCache::new();
    let (tx, events) = mpsc::unbounded_channel();
    let page = InvoicePage::new(
      client,
      cache.clone(),
      Notifier::new(tx),
      PageOptions {
        debounce: Duration::from_millis(300),
        page_size: None,
        tax: Arc::new(NoTax),
      },
    );
    Harness {
      server,
      cache,
      page,
      events,
      _dirs: dirs,
    }
  }

  /// Seed the list key as if a fetch had completed
  fn seed(cache: &QueryCache, key: &QueryKey, records: Vec<InvoiceRecord>) {
    let ticket = cache.begin_fetch(key);
    cache.complete_fetch(ticket, Ok(records));
  }

  fn next_notification(events: &mut mpsc::UnboundedReceiver<Event>) -> Notification {
    loop {
      match events.try_recv() {
        Ok(Event::Notify(n)) => return n,
        Ok(_) => continue,
        Err(e) => panic!("no notification: {e:?}"),
      }
    }
  }

  async fn mount_list(server: &MockServer, records: &[InvoiceRecord]) {
    Mock::given(method("GET"))
      .and(path("/invoices"))
      .respond_with(ResponseTemplate::new(200).set_body_json(records))
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn test_mount_loads_list() {
    let mut h = harness().await;
    mount_list(&h.server, &[record("1"), record("2")]).await;

    assert_eq!(h.page.state(), PageState::IdleList);
    h.page.mount();
    assert_eq!(h.page.state(), PageState::Loading);

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.page.tick(Instant::now());

    assert_eq!(h.page.state(), PageState::ListLoaded);
    assert_eq!(ids(h.page.invoices()), vec!["1", "2"]);
  }

  #[tokio::test]
  async fn test_debounced_search_changes_key() {
    let mut h = harness().await;
    Mock::given(method("GET"))
      .and(path("/invoices"))
      .and(query_param("search", "acme"))
      .respond_with(ResponseTemplate::new(200).set_body_json(vec![record("7")]))
      .expect(1)
      .mount(&h.server)
      .await;
    mount_list(&h.server, &[record("1"), record("2")]).await;

    h.page.mount();
    let start = Instant::now();
    h.page.search_input("a", start);
    h.page.search_input("ac", start + Duration::from_millis(100));
    h.page.search_input("acme", start + Duration::from_millis(200));
    h.page.tick(start + Duration::from_millis(400));
    assert_eq!(h.page.key(), &list_key(""));

    h.page.tick(start + Duration::from_millis(500));
    assert_eq!(h.page.key(), &list_key("acme"));
    assert_eq!(h.page.search_term(), "acme");

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.page.tick(start + Duration::from_millis(600));
    assert_eq!(ids(h.page.invoices()), vec!["7"]);
  }

  #[tokio::test]
  async fn test_view_and_edit_modal_states() {
    let mut h = harness().await;
    let key = list_key("");
    seed(&h.cache, &key, vec![record("1")]);
    h.page.mount();
    h.page.tick(Instant::now());

    let selected = h.page.invoices()[0].clone();
    h.page.open_view(&selected);
    assert_eq!(h.page.state(), PageState::ModalView);

    h.page.open_edit(&selected);
    assert_eq!(h.page.state(), PageState::ModalEdit);
    let draft = h.page.draft_mut().expect("draft");
    draft.change_item(0, ItemField::UnitPrice, "15");
    assert_eq!(draft.record().total, 30.0);
    // Cache untouched by draft edits
    let cached: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(cached[0].total, 20.0);

    h.page.close_modal();
    assert_eq!(h.page.state(), PageState::ListLoaded);
  }

  #[tokio::test]
  async fn test_view_modal_picks_up_full_record() {
    let mut h = harness().await;
    let mut full = record("1");
    full.client_email = Some("billing@client1.example".into());
    Mock::given(method("GET"))
      .and(path("/invoices/1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(&full))
      .expect(1)
      .mount(&h.server)
      .await;

    h.page.open_view(&record("1")).await.expect("task");
    assert!(h.page.tick(Instant::now()));

    match h.page.modal() {
      Some(Modal::View(shown)) => assert_eq!(shown, &full),
      other => panic!("unexpected modal {other:?}"),
    }
    assert_eq!(h.cache.get_query_data::<InvoiceRecord>(&detail_key("1")), Some(full));
  }

  #[tokio::test]
  async fn test_delete_failure_rolls_back() {
    let mut h = harness().await;
    let key = list_key("");
    let before = vec![record("1"), record("2"), record("3")];
    seed(&h.cache, &key, before.clone());
    Mock::given(method("DELETE"))
      .and(path("/invoices/2"))
      .respond_with(
        ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "Database down"})),
      )
      .mount(&h.server)
      .await;

    h.page.open_view(&before[1]);
    h.page.request_delete("2");
    let handle = h.page.confirm_delete().expect("pending delete");

    // Optimistic removal is visible right away and the modal is gone
    let during: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(ids(&during), vec!["1", "3"]);
    assert!(h.page.modal().is_none());

    handle.await.expect("task");

    let after: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(after, before);
    assert!(h.cache.state(&key).invalidated);

    let n = next_notification(&mut h.events);
    assert_eq!(n.level, Level::Error);
    assert_eq!(n.message, "Failed to delete invoice: Database down");
  }

  #[tokio::test]
  async fn test_delete_success_then_reconciles() {
    let mut h = harness().await;
    let key = list_key("");
    seed(&h.cache, &key, vec![record("1"), record("2"), record("3")]);
    Mock::given(method("DELETE"))
      .and(path("/invoices/2"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&h.server)
      .await;
    mount_list(&h.server, &[record("1"), record("3"), record("4")]).await;

    h.page.mount();
    h.page.delete("2").await.expect("task");

    let n = next_notification(&mut h.events);
    assert_eq!(n.level, Level::Success);
    assert!(h.cache.state(&key).invalidated);

    // Next tick refetches and picks up server truth
    h.page.tick(Instant::now());
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.page.tick(Instant::now());
    assert_eq!(ids(h.page.invoices()), vec!["1", "3", "4"]);
  }

  #[tokio::test]
  async fn test_delete_keeps_unrelated_modal_open() {
    let mut h = harness().await;
    let key = list_key("");
    seed(&h.cache, &key, vec![record("1"), record("2")]);
    Mock::given(method("DELETE"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&h.server)
      .await;

    h.page.open_view(&record("1"));
    h.page.delete("2").await.expect("task");
    assert_eq!(h.page.state(), PageState::ModalView);
  }

  #[tokio::test]
  async fn test_update_applies_patch_and_rolls_back_on_failure() {
    let mut h = harness().await;
    let key = list_key("");
    let before = vec![record("1"), record("2")];
    seed(&h.cache, &key, before.clone());
    Mock::given(method("PATCH"))
      .and(path("/invoices/1"))
      .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({"error": "Locked"})))
      .mount(&h.server)
      .await;

    h.page.open_edit(&before[0]);
    let draft = h.page.draft_mut().expect("draft");
    draft.set_field(DraftField::ClientName, "Renamed");
    draft.change_item(0, ItemField::UnitPrice, "15");

    let handle = h.page.save().expect("save");
    assert!(h.page.modal().is_none());
    let during: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(during[0].client_name, "Renamed");
    assert_eq!(during[0].total, 30.0);
    assert_eq!(during[1], before[1]);

    handle.await.expect("task");

    let after: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(after, before);
    let n = next_notification(&mut h.events);
    assert_eq!(n.level, Level::Error);
    assert_eq!(n.message, "Failed to update invoice: Locked");
  }

  #[tokio::test]
  async fn test_update_success_keeps_patch() {
    let mut h = harness().await;
    let key = list_key("");
    seed(&h.cache, &key, vec![record("1")]);
    Mock::given(method("PATCH"))
      .and(path("/invoices/1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(record("1")))
      .mount(&h.server)
      .await;

    h.page.open_edit(&record("1"));
    h.page
      .draft_mut()
      .expect("draft")
      .set_field(DraftField::Status, "paid");
    h.page.save().expect("save").await.expect("task");

    let after: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(after[0].status, "paid");
    assert!(h.cache.state(&key).invalidated);
    assert_eq!(next_notification(&mut h.events).level, Level::Success);
  }

  #[tokio::test]
  async fn test_update_sends_cleared_field() {
    let mut h = harness().await;
    let key = list_key("");
    let mut existing = record("1");
    existing.client_email = Some("old@example.com".into());
    seed(&h.cache, &key, vec![existing.clone()]);
    Mock::given(method("PATCH"))
      .and(path("/invoices/1"))
      .and(body_partial_json(serde_json::json!({"clientEmail": null})))
      .respond_with(ResponseTemplate::new(200).set_body_json(record("1")))
      .expect(1)
      .mount(&h.server)
      .await;

    h.page.open_edit(&existing);
    h.page
      .draft_mut()
      .expect("draft")
      .set_field(DraftField::ClientEmail, "");
    let handle = h.page.save().expect("save");

    let during: Vec<InvoiceRecord> = h.cache.get_query_data(&key).expect("cached");
    assert_eq!(during[0].client_email, None);

    handle.await.expect("task");
    assert_eq!(next_notification(&mut h.events).level, Level::Success);
  }

  #[tokio::test]
  async fn test_create_invalidates_every_invoice_list() {
    let mut h = harness().await;
    let all = list_key("");
    let searched = list_key("acme");
    seed(&h.cache, &all, vec![record("1")]);
    seed(&h.cache, &searched, vec![]);
    Mock::given(method("POST"))
      .and(path("/invoices"))
      .respond_with(ResponseTemplate::new(201).set_body_json(record("9")))
      .mount(&h.server)
      .await;

    h.page.open_create();
    assert_eq!(h.page.state(), PageState::ModalEdit);
    h.page
      .draft_mut()
      .expect("draft")
      .set_field(DraftField::ClientName, "New Co");
    h.page.save().expect("save").await.expect("task");

    assert!(h.cache.state(&all).invalidated);
    assert!(h.cache.state(&searched).invalidated);
    let n = next_notification(&mut h.events);
    assert_eq!(n.message, "Invoice INV-9 created");
  }

  #[tokio::test]
  async fn test_save_without_draft_is_noop() {
    let mut h = harness().await;
    assert!(h.page.save().is_none());
    h.page.open_view(&record("1"));
    assert!(h.page.save().is_none());
  }

  #[tokio::test]
  async fn test_export_notifies() {
    let mut h = harness().await;
    Mock::given(method("GET"))
      .and(path("/invoices/1/pdf"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
      .mount(&h.server)
      .await;
    Mock::given(method("GET"))
      .and(path("/invoices/2/pdf"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&h.server)
      .await;

    h.page.export_pdf("1", true).await.expect("task");
    let n = next_notification(&mut h.events);
    assert_eq!(n.level, Level::Info);
    assert!(n.message.starts_with("Preview ready: file://"));

    h.page.export_pdf("2", false).await.expect("task");
    let n = next_notification(&mut h.events);
    assert_eq!(n.level, Level::Error);
    assert_eq!(n.message, "Failed to export PDF: Not Found");
  }
}
