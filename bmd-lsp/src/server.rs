//! Main language server implementation

use std::sync::Arc;

use bmd_analyzer::{AnalysisRequest, AnalysisResult, Analyzer, PredictRequest, PredictResult};
use tower_lsp::async_trait;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeConfigurationParams, InitializeParams, InitializeResult, InitializedParams,
    MessageType, Registration, SemanticTokens, SemanticTokensFullOptions, SemanticTokensOptions,
    SemanticTokensParams, SemanticTokensResult, ServerCapabilities, ServerInfo, TextDocumentItem,
    TextDocumentSyncCapability, TextDocumentSyncKind, Url, WorkDoneProgressOptions,
};
use tower_lsp::{Client, LspService, Server};

use crate::client::LspClient;
use crate::documents::{DocumentSnapshot, DocumentStore};
use crate::features::{completion, diagnostics, semantic_tokens};
use crate::settings::{SessionSettings, CONFIGURATION_SECTION};

/// The BMD language server.
///
/// Generic over the engine binding (the analysis engine lives outside this
/// crate) and over the client surface, so tests drive the full pipeline with
/// recording doubles.
pub struct BmdLanguageServer<A, C = Client> {
    client: C,
    analyzer: Arc<A>,
    documents: DocumentStore,
    settings: SessionSettings,
}

impl<A: Analyzer> BmdLanguageServer<A> {
    pub fn new(client: Client, analyzer: Arc<A>) -> Self {
        Self::with_client(client, analyzer)
    }
}

impl<A, C> BmdLanguageServer<A, C>
where
    A: Analyzer,
    C: LspClient,
{
    pub fn with_client(client: C, analyzer: Arc<A>) -> Self {
        Self {
            client,
            analyzer,
            documents: DocumentStore::default(),
            settings: SessionSettings::new(),
        }
    }

    /// Run the analysis pipeline for one snapshot and publish the resulting
    /// diagnostic set, replacing whatever was published for the URI before.
    ///
    /// The snapshot is fixed at dispatch time: a change arriving while the
    /// engine call is in flight triggers its own validate run, whose publish
    /// supersedes this one.
    async fn validate(&self, uri: &Url, snapshot: &DocumentSnapshot) {
        let settings = self.settings.get_or_fetch(&self.client, uri).await;
        let result = self
            .analyzer
            .analyze(AnalysisRequest::new(snapshot.text()))
            .await;
        let diagnostics = diagnostics::diagnostics_for(snapshot, &result);
        if diagnostics.len() > settings.max_number_of_problems as usize {
            self.client
                .log_message(
                    MessageType::WARNING,
                    format!(
                        "{}: {} problems reported, configured maximum is {}",
                        uri,
                        diagnostics.len(),
                        settings.max_number_of_problems
                    ),
                )
                .await;
        }
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(snapshot.version()))
            .await;
    }

    async fn revalidate_all(&self) {
        for (uri, snapshot) in self.documents.all().await {
            self.validate(&uri, &snapshot).await;
        }
    }
}

#[async_trait]
impl<A, C> tower_lsp::LanguageServer for BmdLanguageServer<A, C>
where
    A: Analyzer,
    C: LspClient,
{
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let supports_configuration = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|workspace| workspace.configuration)
            .unwrap_or(false);
        if supports_configuration {
            self.settings.enable_configuration_requests();
        }

        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            completion_provider: Some(CompletionOptions {
                resolve_provider: Some(true),
                ..CompletionOptions::default()
            }),
            semantic_tokens_provider: Some(
                lsp_types::SemanticTokensServerCapabilities::SemanticTokensOptions(
                    SemanticTokensOptions {
                        work_done_progress_options: WorkDoneProgressOptions::default(),
                        legend: semantic_tokens::legend(),
                        range: None,
                        full: Some(SemanticTokensFullOptions::Bool(true)),
                    },
                ),
            ),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "bmd-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        if self.settings.supports_configuration_requests() {
            let registration = Registration {
                id: "workspace/didChangeConfiguration".to_string(),
                method: "workspace/didChangeConfiguration".to_string(),
                register_options: None,
            };
            if let Err(error) = self.client.register_capability(vec![registration]).await {
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("failed to register for configuration changes: {error}"),
                    )
                    .await;
            }
        }
        self.client
            .log_message(
                MessageType::INFO,
                "BMD language server initialized".to_string(),
            )
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: lsp_types::DidOpenTextDocumentParams) {
        let TextDocumentItem { uri, text, .. } = params.text_document;
        let snapshot = self.documents.open(uri.clone(), text).await;
        self.validate(&uri, &snapshot).await;
    }

    async fn did_change(&self, params: lsp_types::DidChangeTextDocumentParams) {
        // Full sync: the last change carries the complete text.
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            if let Some(snapshot) = self.documents.change(&uri, change.text).await {
                self.validate(&uri, &snapshot).await;
            }
        }
    }

    async fn did_close(&self, params: lsp_types::DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.close(&uri).await;
        self.settings.forget(&uri).await;
        // Drop the published squiggles along with the document.
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        if self.settings.supports_configuration_requests() {
            self.settings.invalidate_all().await;
        } else {
            let global = params
                .settings
                .get(CONFIGURATION_SECTION)
                .cloned()
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or_default();
            self.settings.set_global(global).await;
        }
        self.revalidate_all().await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let Some(snapshot) = self.documents.get(&uri).await else {
            // A closed or unknown document simply offers no completions.
            return Ok(Some(CompletionResponse::Array(Vec::new())));
        };
        let offset = snapshot.utf16_offset_at(params.text_document_position.position);
        let request = PredictRequest::new(AnalysisRequest::new(snapshot.text()), offset);
        match self.analyzer.predict(request).await {
            PredictResult::Success { proposals } => Ok(Some(CompletionResponse::Array(
                completion::items_for(proposals),
            ))),
            PredictResult::Failure { error } => {
                self.client
                    .log_message(
                        MessageType::ERROR,
                        error.unwrap_or_else(|| "Failed to parse, cannot predict".to_string()),
                    )
                    .await;
                Ok(Some(CompletionResponse::Array(Vec::new())))
            }
        }
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        Ok(completion::resolve(item))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let Some(snapshot) = self.documents.get(&params.text_document.uri).await else {
            return Ok(Some(empty_tokens()));
        };
        let result = self
            .analyzer
            .analyze(AnalysisRequest::new(snapshot.text()))
            .await;
        let data = match result {
            AnalysisResult::Success { styles, .. } => {
                semantic_tokens::encode_style_spans(&snapshot, styles)
            }
            AnalysisResult::Failure { .. } => {
                self.client
                    .log_message(
                        MessageType::ERROR,
                        "Unhandled parsing error, styles will not be available".to_string(),
                    )
                    .await;
                Vec::new()
            }
        };
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        })))
    }
}

fn empty_tokens() -> SemanticTokensResult {
    SemanticTokensResult::Tokens(SemanticTokens {
        result_id: None,
        data: Vec::new(),
    })
}

/// Build the tower service for an engine binding.
pub fn service<A: Analyzer>(
    analyzer: Arc<A>,
) -> (LspService<BmdLanguageServer<A>>, tower_lsp::ClientSocket) {
    LspService::new(move |client| BmdLanguageServer::new(client, analyzer))
}

/// Serve over stdio, the transport editors spawn language servers with.
pub async fn run_stdio<A: Analyzer>(analyzer: Arc<A>) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = service(analyzer);
    Server::new(stdin, stdout, socket).serve(service).await;
}
