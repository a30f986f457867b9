//! Per-document settings cache and session configuration state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::{ConfigurationItem, Url};

use crate::client::LspClient;

/// Configuration section the server reads, `bmd.*` on the client side.
pub const CONFIGURATION_SECTION: &str = "bmd";

/// User-facing knobs. Wire names are camelCase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BmdSettings {
    pub max_number_of_problems: u32,
}

impl Default for BmdSettings {
    fn default() -> Self {
        Self {
            max_number_of_problems: 1000,
        }
    }
}

/// Session-wide configuration state: the negotiated capability flag, the
/// global fallback, and the per-document cache.
///
/// Clients that support `workspace/configuration` get one scoped request per
/// open document, cached until the next configuration-change notification.
/// Clients that don't are served the global value pushed with the
/// notification itself.
#[derive(Default)]
pub struct SessionSettings {
    configuration_capability: AtomicBool,
    global: RwLock<BmdSettings>,
    by_document: RwLock<HashMap<Url, BmdSettings>>,
}

impl SessionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the client can serve scoped configuration requests.
    /// Flipped once during the initialize handshake.
    pub fn enable_configuration_requests(&self) {
        self.configuration_capability.store(true, Ordering::SeqCst);
    }

    pub fn supports_configuration_requests(&self) -> bool {
        self.configuration_capability.load(Ordering::SeqCst)
    }

    /// Replace the global fallback used when the client cannot serve scoped
    /// configuration requests.
    pub async fn set_global(&self, settings: BmdSettings) {
        *self.global.write().await = settings;
    }

    /// Settings for one document: the cached value, else one configuration
    /// request scoped to the URI. Fetch or decode failures fall back to the
    /// defaults and are cached like any other value.
    pub async fn get_or_fetch<C: LspClient>(&self, client: &C, uri: &Url) -> BmdSettings {
        if !self.supports_configuration_requests() {
            return *self.global.read().await;
        }
        if let Some(settings) = self.by_document.read().await.get(uri) {
            return *settings;
        }
        let fetched = client
            .configuration(vec![ConfigurationItem {
                scope_uri: Some(uri.clone()),
                section: Some(CONFIGURATION_SECTION.to_string()),
            }])
            .await
            .ok()
            .and_then(|values| values.into_iter().next())
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        self.by_document.write().await.insert(uri.clone(), fetched);
        fetched
    }

    /// Drop every cached per-document value; the next validate run fetches
    /// fresh settings.
    pub async fn invalidate_all(&self) {
        self.by_document.write().await.clear();
    }

    /// Drop the cached value for a closed document.
    pub async fn forget(&self, uri: &Url) {
        self.by_document.write().await.remove(uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use serde_json::json;
    use tower_lsp::async_trait;
    use tower_lsp::jsonrpc::Result;
    use tower_lsp::lsp_types::{Diagnostic, MessageType, Registration};

    #[derive(Default)]
    struct StubClient {
        fetches: AtomicUsize,
        response: Mutex<serde_json::Value>,
    }

    #[async_trait]
    impl LspClient for StubClient {
        async fn publish_diagnostics(&self, _: Url, _: Vec<Diagnostic>, _: Option<i32>) {}

        async fn log_message(&self, _: MessageType, _: String) {}

        async fn configuration(
            &self,
            _: Vec<ConfigurationItem>,
        ) -> Result<Vec<serde_json::Value>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![self.response.lock().unwrap().clone()])
        }

        async fn register_capability(&self, _: Vec<Registration>) -> Result<()> {
            Ok(())
        }
    }

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///{path}")).unwrap()
    }

    #[tokio::test]
    async fn serves_global_fallback_without_capability() {
        let settings = SessionSettings::new();
        let client = StubClient::default();

        let value = settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(value, BmdSettings::default());
        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);

        settings
            .set_global(BmdSettings {
                max_number_of_problems: 7,
            })
            .await;
        let value = settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(value.max_number_of_problems, 7);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetches_once_per_document() {
        let settings = SessionSettings::new();
        settings.enable_configuration_requests();
        let client = StubClient::default();
        *client.response.lock().unwrap() = json!({ "maxNumberOfProblems": 42 });

        let first = settings.get_or_fetch(&client, &uri("a.bmd")).await;
        let second = settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(first.max_number_of_problems, 42);
        assert_eq!(second, first);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);

        settings.get_or_fetch(&client, &uri("b.bmd")).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_all_forces_refetch() {
        let settings = SessionSettings::new();
        settings.enable_configuration_requests();
        let client = StubClient::default();

        settings.get_or_fetch(&client, &uri("a.bmd")).await;
        settings.invalidate_all().await;
        settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forget_drops_one_document() {
        let settings = SessionSettings::new();
        settings.enable_configuration_requests();
        let client = StubClient::default();

        settings.get_or_fetch(&client, &uri("a.bmd")).await;
        settings.get_or_fetch(&client, &uri("b.bmd")).await;
        settings.forget(&uri("a.bmd")).await;

        settings.get_or_fetch(&client, &uri("b.bmd")).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
        settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_configuration_falls_back_to_defaults() {
        let settings = SessionSettings::new();
        settings.enable_configuration_requests();
        let client = StubClient::default();
        *client.response.lock().unwrap() = json!("not a settings object");

        let value = settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(value, BmdSettings::default());

        // The fallback is cached like any other value.
        settings.get_or_fetch(&client, &uri("a.bmd")).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }
}
