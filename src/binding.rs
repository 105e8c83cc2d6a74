// SPF Command Gate - Bindings
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// A Binding ties a token path to a handler plus its access policy.
// A CompletionBinding does the same for suggestion providers.
// Both are immutable once built and shared read-only across senders.

use crate::error::BuildError;
use crate::sender::Sender;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Command target: receives the sender and the unconsumed argument tail
pub type Handler = Arc<dyn Fn(&dyn Sender, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// Suggestion target: receives the sender and the tokens still being typed
pub type Completer = Arc<dyn Fn(&dyn Sender, &[String]) -> anyhow::Result<Vec<String>> + Send + Sync>;

/// Wrap a closure as a Handler
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&dyn Sender, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a Completer
pub fn completer<F>(f: F) -> Completer
where
    F: Fn(&dyn Sender, &[String]) -> anyhow::Result<Vec<String>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Completer returning a fixed list
pub fn suggestions<I, S>(items: I) -> Completer
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<String> = items.into_iter().map(Into::into).collect();
    Arc::new(move |_, _| Ok(items.clone()))
}

// ============================================================================
// DECLARATIVE DESCRIPTORS
// ============================================================================

/// Binding metadata as declared by the caller: `path` is the parent path,
/// `name` the final token. The routed path is `path + [name]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    #[serde(default)]
    pub path: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub max_args: usize,
}

impl BindingSpec {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    /// Set the parent path
    pub fn under(mut self, path: &[&str]) -> Self {
        self.path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn permission(mut self, permission: &str) -> Self {
        self.permission = permission.to_string();
        self
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn max_args(mut self, max_args: usize) -> Self {
        self.max_args = max_args;
        self
    }

    pub fn full_path(&self) -> Vec<String> {
        let mut full = self.path.clone();
        full.push(self.name.clone());
        full
    }
}

/// Completion metadata, same path convention as BindingSpec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSpec {
    #[serde(default)]
    pub path: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub priority: i32,
}

impl CompletionSpec {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn under(mut self, path: &[&str]) -> Self {
        self.path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn permission(mut self, permission: &str) -> Self {
        self.permission = permission.to_string();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn full_path(&self) -> Vec<String> {
        let mut full = self.path.clone();
        full.push(self.name.clone());
        full
    }
}

/// Reject empty paths and empty tokens. Routed paths are non-empty token sequences.
pub fn validate_path(path: &[String]) -> Result<(), BuildError> {
    if path.is_empty() {
        return Err(BuildError::misconfigured(path, "path must contain at least one token"));
    }
    if path.iter().any(|t| t.is_empty()) {
        return Err(BuildError::misconfigured(path, "path contains an empty token"));
    }
    if path.iter().any(|t| t.chars().any(char::is_whitespace)) {
        return Err(BuildError::misconfigured(path, "path token contains whitespace"));
    }
    Ok(())
}

// ============================================================================
// BOUND RECORDS
// ============================================================================

/// A routable unit attached to exactly one trie node
#[derive(Clone)]
pub struct Binding {
    pub path: Vec<String>,
    pub target: Handler,
    pub permission: String,
    pub weight: i32,
    pub max_args: usize,
}

impl Binding {
    pub fn new(spec: &BindingSpec, target: Handler) -> Self {
        Self {
            path: spec.full_path(),
            target,
            permission: spec.permission.clone(),
            weight: spec.weight,
            max_args: spec.max_args,
        }
    }

    /// Empty permission means always allowed
    pub fn permits(&self, sender: &dyn Sender) -> bool {
        self.permission.is_empty() || sender.has_permission(&self.permission)
    }

    /// Run the target. Errors and panics come back as a failure reason.
    pub fn invoke(&self, sender: &dyn Sender, args: &[String]) -> Result<(), String> {
        contain(|| (self.target)(sender, args))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("path", &self.path)
            .field("permission", &self.permission)
            .field("weight", &self.weight)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

/// A suggestion provider attached to exactly one trie node
#[derive(Clone)]
pub struct CompletionBinding {
    pub path: Vec<String>,
    pub target: Completer,
    pub permission: String,
    /// Stored and exported; not used for ordering
    pub priority: i32,
}

impl CompletionBinding {
    pub fn new(spec: &CompletionSpec, target: Completer) -> Self {
        Self {
            path: spec.full_path(),
            target,
            permission: spec.permission.clone(),
            priority: spec.priority,
        }
    }

    pub fn permits(&self, sender: &dyn Sender) -> bool {
        self.permission.is_empty() || sender.has_permission(&self.permission)
    }

    pub fn invoke(&self, sender: &dyn Sender, tokens: &[String]) -> Result<Vec<String>, String> {
        contain(|| (self.target)(sender, tokens))
    }
}

impl fmt::Debug for CompletionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionBinding")
            .field("path", &self.path)
            .field("permission", &self.permission)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FAILURE CONTAINMENT
// ============================================================================

/// Run user code, turning both `Err` and a panic into a failure reason
pub(crate) fn contain<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(format!("panicked: {}", msg))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
