//! Language Server Protocol (LSP) front end for the BMD modeling language.
//!
//!     BMD documents are parsed and analyzed by an external engine; this crate
//!     owns everything between that engine and an LSP client: per-document
//!     lifecycle, diagnostics publishing, semantic highlighting, and two-phase
//!     completion.
//!
//! Design Decision: tower-lsp
//!
//!     The server is built on tower-lsp, the high-level async LSP framework:
//!         - JSON-RPC plumbing, handshaking and routing come for free
//!         - async/await fits the potentially-remote analysis engine
//!         - the `LanguageServer` trait keeps handlers small and testable
//!
//!     Trade-off: trait methods take `&self`, so all mutable state lives
//!     behind async locks. The state here is small (open documents, cached
//!     settings), so that's the standard pattern rather than a burden.
//!
//! Design Decision: the engine is a capability, not a dependency
//!
//!     The analysis engine is consumed strictly through the `Analyzer` trait
//!     from the `bmd-analyzer` crate. The server never sees parse trees, only
//!     value types: markers, style spans, completion proposals. Any binding
//!     (embedded library, spawned process, network call) satisfies the trait,
//!     and the whole pipeline is testable against a scripted mock. For the
//!     same reason this crate ships no binary: an embedding links an engine
//!     crate and calls [`server::run_stdio`].
//!
//! Architecture
//!
//!     LSP Layer (tower-lsp):
//!         - JSON-RPC communication, capability negotiation, routing
//!
//!     Server Layer (server.rs):
//!         - Implements the LanguageServer trait
//!         - Owns the document store and the settings cache
//!         - Coordinates the feature layer; thin, mostly glue
//!
//!     Feature Layer (features/):
//!         - Stateless transformations from analysis results to protocol
//!           values: diagnostics, semantic tokens, completion items
//!         - All logic and dense unit tests
//!
//! Behavior notes
//!
//!     - Documents sync whole-text (full sync); every change re-analyzes the
//!       complete snapshot. BMD documents are small; incremental reparse is
//!       not worth the bookkeeping.
//!     - Diagnostics are published as a full replacement per document, tagged
//!       with the store's own monotonic version.
//!     - An engine failure is itself a diagnostic (one, spanning the whole
//!       document) on the validate path, and an empty result plus a client
//!       log everywhere else. Nothing the engine does can fail a request or
//!       crash the server.
//!
//! Testing Strategy
//!
//!     Feature modules are tested exhaustively as pure functions. The server
//!     layer is tested end-to-end against a recording client double and a
//!     scripted mock engine, asserting on exactly what would go over the
//!     wire. Encoder ordering properties are covered with proptest.

pub mod client;
pub mod documents;
pub mod features;
pub mod server;
pub mod settings;

pub use server::{run_stdio, service, BmdLanguageServer};
