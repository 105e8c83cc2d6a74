// SPF Command Gate - Library Root
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// All modules exported here for use by the binary and tests.

pub mod binding;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod manifest;
pub mod sender;

// ============================================================================
// ROUTING TABLES
// ============================================================================

/// Path-dispatch trie
pub mod node;

/// Lazily constructed handler objects keyed by dotted path
pub mod registry;

/// Bindings bundled under a shared base path
pub mod group;

pub use binding::{completer, handler, suggestions, BindingSpec, CompletionSpec};
pub use dispatcher::{DispatchReport, Dispatcher, DispatcherBuilder};
pub use error::{BuildError, DispatchError};
pub use sender::Sender;
