//! Narrow view of the LSP client used by the server.
//!
//! `tower_lsp::Client` cannot be constructed outside a running service, so
//! the server is generic over the handful of client operations it actually
//! performs and tests substitute a recording double.

use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{ConfigurationItem, Diagnostic, MessageType, Registration, Url};
use tower_lsp::Client;

#[async_trait]
pub trait LspClient: Send + Sync + 'static {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    );

    async fn log_message(&self, typ: MessageType, message: String);

    async fn configuration(
        &self,
        items: Vec<ConfigurationItem>,
    ) -> Result<Vec<serde_json::Value>>;

    async fn register_capability(&self, registrations: Vec<Registration>) -> Result<()>;
}

#[async_trait]
impl LspClient for Client {
    async fn publish_diagnostics(
        &self,
        uri: Url,
        diagnostics: Vec<Diagnostic>,
        version: Option<i32>,
    ) {
        Client::publish_diagnostics(self, uri, diagnostics, version).await;
    }

    async fn log_message(&self, typ: MessageType, message: String) {
        Client::log_message(self, typ, message).await;
    }

    async fn configuration(
        &self,
        items: Vec<ConfigurationItem>,
    ) -> Result<Vec<serde_json::Value>> {
        Client::configuration(self, items).await
    }

    async fn register_capability(&self, registrations: Vec<Registration>) -> Result<()> {
        Client::register_capability(self, registrations).await
    }
}
