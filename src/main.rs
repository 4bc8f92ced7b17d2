mod api;
mod app;
mod cache;
mod commands;
mod config;
mod debounce;
mod deeplink;
mod event;
mod invoices;
mod notify;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::InvoiceClient;
use crate::cache::QueryCache;
use crate::deeplink::DeepLink;
use crate::event::{Event, EventHandler};
use crate::invoices::{tax, InvoicePage, PageOptions};
use crate::notify::Notifier;
use crate::ui::renderfns::extract_domain;
use crate::ui::views::InvoiceListView;

const TICK_RATE: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "procura")]
#[command(about = "A terminal client for procurement invoicing")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./procura.yaml or $XDG_CONFIG_HOME/procura/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, overrides api.url from the config
  #[arg(short, long)]
  url: Option<String>,

  /// Callback URL to handle on startup, e.g. procura://callback?status=success
  #[arg(long)]
  deep_link: Option<String>,
}

/// Log to a file in the data dir; the terminal belongs to the UI.
/// Filter with PROCURA_LOG (default "info").
fn init_logging() -> Result<WorkerGuard> {
  let dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local").join("share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("procura");
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "procura.log"));
  let filter = EnvFilter::try_from_env("PROCURA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to initialise logging: {}", e))?;

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging()?;

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let deep_link = args
    .deep_link
    .as_deref()
    .map(DeepLink::parse)
    .transpose()
    .map_err(|e| eyre!("{}", e))?;

  info!(api = %config.api.url, "Starting procura");

  let client = InvoiceClient::new(&config)?;
  let cache = QueryCache::new().with_stale_time(config.cache.stale_time());
  let events = EventHandler::new(TICK_RATE);
  let notifier = Notifier::new(events.sender());

  let page = InvoicePage::new(
    client,
    cache.clone(),
    notifier.clone(),
    PageOptions {
      debounce: config.search.debounce(),
      page_size: config.search.page_size,
      tax: tax::from_rate(config.tax.rate),
    },
  );

  if let Some(link) = deep_link {
    // Handled by the loop once it starts
    let _ = events.sender().send(Event::DeepLink(link));
  }

  let title = config
    .title
    .clone()
    .unwrap_or_else(|| extract_domain(&config.api.url).to_string());

  let view = Box::new(InvoiceListView::new(page));
  let mut app = app::App::new(title, view, cache, notifier, events);
  app.run().await?;

  Ok(())
}
