// SPF Command Gate - Sender Capability
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// The only view the router has of whoever issued a command:
// a permission predicate and a message sink.

use std::collections::BTreeSet;
use std::sync::Mutex;

/// Actor issuing a command
pub trait Sender: Send + Sync {
    /// Display name for logs and replies
    fn name(&self) -> &str;

    fn has_permission(&self, permission: &str) -> bool;

    /// Deliver a user-visible message
    fn send_message(&self, message: &str);
}

/// Sender that records every message it receives
#[derive(Debug, Default)]
pub struct MemorySender {
    name: String,
    permissions: BTreeSet<String>,
    inbox: Mutex<Vec<String>>,
}

impl MemorySender {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            permissions: BTreeSet::new(),
            inbox: Mutex::new(Vec::new()),
        }
    }

    /// Builder-style grant of a single permission
    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.to_string());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Snapshot of received messages, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.inbox.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<String> {
        self.inbox.lock().ok().and_then(|m| m.last().cloned())
    }

    /// Drain the inbox
    pub fn take_messages(&self) -> Vec<String> {
        match self.inbox.lock() {
            Ok(mut m) => std::mem::take(&mut *m),
            Err(_) => Vec::new(),
        }
    }
}

impl Sender for MemorySender {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    fn send_message(&self, message: &str) {
        if let Ok(mut inbox) = self.inbox.lock() {
            inbox.push(message.to_string());
        }
    }
}

/// Sender bound to the terminal: messages go straight to stdout
#[derive(Debug, Default)]
pub struct ConsoleSender {
    name: String,
    permissions: BTreeSet<String>,
}

impl ConsoleSender {
    pub fn new(name: &str, permissions: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.to_string(),
            permissions: permissions.into_iter().collect(),
        }
    }
}

impl Sender for ConsoleSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    fn send_message(&self, message: &str) {
        println!("{}", message);
    }
}

// ============================================================================
// TESTS
// ============================================================================
