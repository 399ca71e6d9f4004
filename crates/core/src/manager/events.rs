//! Event dispatch for the cache manager.
//!
//! A host runtime turns whatever it observes (a deploy, a page request, a
//! message from the application) into a [`WorkerEvent`] and hands it to
//! [`dispatch`]. The manager only sees the four named handlers of
//! [`EventHandler`], never the host's event model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ActivateReport, CacheManager, FetchOutcome, InstallReport, MessageOutcome};
use crate::Error;
use crate::http::CacheRequest;

/// Out-of-band command from the application layer.
///
/// Wire format: `{"type":"CACHE_DYNAMIC_ROUTE","saleId":"42"}` or `{"type":"SKIP_WAITING"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Warm the store for a freshly created record's detail route.
    CacheDynamicRoute {
        #[serde(rename = "saleId")]
        sale_id: String,
    },
    /// Activate an installed version without waiting.
    SkipWaiting,
}

/// Notification pushed to every open client page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientNotice {
    /// A new version took control; the page should offer a refresh.
    ContentUpdated { version: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(CacheRequest),
    Message(WorkerMessage),
}

#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Handled(MessageOutcome),
}

/// The four lifecycle handlers a cache worker exposes.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, Error>;

    async fn on_activate(&self) -> Result<ActivateReport, Error>;

    /// Always resolves; fallbacks are the handler's job.
    async fn on_fetch(&self, request: CacheRequest) -> FetchOutcome;

    async fn on_message(&self, message: WorkerMessage) -> Result<MessageOutcome, Error>;
}

/// Route one event to the matching handler.
pub async fn dispatch<H>(handler: &H, event: WorkerEvent) -> Result<EventOutcome, Error>
where
    H: EventHandler + ?Sized,
{
    match event {
        WorkerEvent::Install => handler.on_install().await.map(EventOutcome::Installed),
        WorkerEvent::Activate => handler.on_activate().await.map(EventOutcome::Activated),
        WorkerEvent::Fetch(request) => Ok(EventOutcome::Fetched(handler.on_fetch(request).await)),
        WorkerEvent::Message(message) => handler.on_message(message).await.map(EventOutcome::Handled),
    }
}

/// Install, then activate straight away if the install allows it.
///
/// Returns the activation report when activation happened.
pub async fn bootstrap<H>(handler: &H) -> Result<(InstallReport, Option<ActivateReport>), Error>
where
    H: EventHandler + ?Sized,
{
    let installed = handler.on_install().await?;
    if !installed.skip_waiting {
        tracing::info!(store = %installed.store, "installed; waiting for SKIP_WAITING");
        return Ok((installed, None));
    }
    let activated = handler.on_activate().await?;
    Ok((installed, Some(activated)))
}

#[async_trait]
impl EventHandler for CacheManager {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        self.install().await
    }

    async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.activate().await
    }

    async fn on_fetch(&self, request: CacheRequest) -> FetchOutcome {
        self.handle_fetch(&request).await
    }

    async fn on_message(&self, message: WorkerMessage) -> Result<MessageOutcome, Error> {
        self.handle_message(message).await
    }
}
