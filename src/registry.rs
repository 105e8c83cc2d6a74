// SPF Command Gate - Handler Registry
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Secondary routing table for whole handler objects, keyed by dotted path
// ("admin.ban"). Consulted only when the trie has no root for the first
// token. Handlers are built on first use and cached for the lifetime of
// the dispatcher; each entry carries its own init lock so concurrent first
// calls construct exactly once.

use crate::binding::{contain, validate_path};
use crate::error::{BuildError, DispatchError};
use crate::sender::Sender;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// A handler object owning execution, completion and its own access policy
pub trait SubCommandHandler: Send + Sync {
    fn execute(&self, sender: &dyn Sender, args: &[String]) -> anyhow::Result<()>;

    /// Suggestions for `args`. `None` means no suggestions.
    fn complete(&self, _sender: &dyn Sender, _args: &[String]) -> anyhow::Result<Option<Vec<String>>> {
        Ok(None)
    }

    fn has_permission(&self, _sender: &dyn Sender) -> bool {
        true
    }

    fn max_args(&self) -> usize {
        0
    }
}

/// Builds a handler on first use
pub type HandlerFactory =
    Box<dyn Fn() -> anyhow::Result<Box<dyn SubCommandHandler>> + Send + Sync>;

struct Entry {
    factory: HandlerFactory,
    instance: Mutex<Option<Arc<dyn SubCommandHandler>>>,
}

/// Registry hit: the dotted key, how many tokens it consumed, and the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOutcome {
    pub key: String,
    pub consumed: usize,
    pub result: Result<(), DispatchError>,
}

#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

pub fn dotted(path: &[String]) -> String {
    path.join(".")
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory at `path`. Re-registering a path replaces the factory.
    pub fn register(&mut self, path: &[String], factory: HandlerFactory) -> Result<(), BuildError> {
        validate_path(path)?;
        if path.iter().any(|t| t.contains('.')) {
            return Err(BuildError::misconfigured(path, "handler class path token contains '.'"));
        }
        let key = dotted(path);
        log::debug!("Registering handler class: {}", key);
        if self
            .entries
            .insert(key.clone(), Entry { factory, instance: Mutex::new(None) })
            .is_some()
        {
            log::warn!("Handler registration for '{}' replaced an earlier one", key);
        }
        Ok(())
    }

    pub fn contains(&self, path: &[String]) -> bool {
        self.entries.contains_key(&dotted(path))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All registered dotted paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// First tokens of every registered path
    pub fn root_tokens(&self) -> BTreeSet<String> {
        self.entries
            .keys()
            .filter_map(|k| k.split('.').next().map(str::to_string))
            .collect()
    }

    /// How many handlers have been constructed so far
    pub fn instantiated(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.instance.lock().map(|i| i.is_some()).unwrap_or(false))
            .count()
    }

    /// Longest registered prefix of `tokens`. A token containing '.' ends the prefix.
    fn lookup(&self, tokens: &[String]) -> Option<(String, &Entry, usize)> {
        let usable = tokens.iter().position(|t| t.contains('.')).unwrap_or(tokens.len());
        (1..=usable).rev().find_map(|n| {
            let key = dotted(&tokens[..n]);
            self.entries.get(&key).map(|entry| (key, entry, n))
        })
    }

    /// Cached instance, constructing it under the entry lock if needed
    fn instance(&self, key: &str, entry: &Entry) -> Result<Arc<dyn SubCommandHandler>, String> {
        let mut slot = entry
            .instance
            .lock()
            .map_err(|_| format!("handler slot for '{}' is poisoned", key))?;
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let built: Arc<dyn SubCommandHandler> = Arc::from(contain(|| (entry.factory)())?);
        log::info!("Instantiated handler for '{}'", key);
        *slot = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Run the handler registered for the longest matching prefix of `tokens`.
    /// `None` when no prefix is registered.
    pub fn dispatch(&self, sender: &dyn Sender, tokens: &[String]) -> Option<RegistryOutcome> {
        let (key, entry, consumed) = self.lookup(tokens)?;
        let args = &tokens[consumed..];

        let result = (|| {
            let handler = self.instance(&key, entry).map_err(|reason| {
                log::error!("Failed to create handler '{}': {}", key, reason);
                DispatchError::HandlerError { reason }
            })?;

            if !handler.has_permission(sender) {
                return Err(DispatchError::Forbidden { permission: key.clone() });
            }

            let max = handler.max_args();
            if args.len() > max {
                return Err(DispatchError::TooManyArgs { max });
            }

            contain(|| handler.execute(sender, args)).map_err(|reason| {
                log::error!("Error executing handler '{}': {}", key, reason);
                DispatchError::HandlerError { reason }
            })
        })();

        Some(RegistryOutcome { key, consumed, result })
    }

    /// Suggestions from the handler registered for the longest matching prefix
    pub fn complete(&self, sender: &dyn Sender, tokens: &[String]) -> Option<Vec<String>> {
        let (key, entry, consumed) = self.lookup(tokens)?;
        let handler = match self.instance(&key, entry) {
            Ok(h) => h,
            Err(reason) => {
                log::error!("Failed to create handler '{}': {}", key, reason);
                return None;
            }
        };
        if !handler.has_permission(sender) {
            return None;
        }
        match contain(|| handler.complete(sender, &tokens[consumed..])) {
            Ok(items) => items,
            Err(reason) => {
                log::error!("Error getting completions from '{}': {}", key, reason);
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
