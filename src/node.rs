// SPF Command Gate - Trie Node
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Path-dispatch trie. Each node holds at most one Binding, at most one
// CompletionBinding, and children keyed by the next token (exact,
// case-sensitive). Built once, read-only afterwards.
//
// Resolution is single pass, no backtracking: a node with a binding stops
// the walk early when the remaining tokens fit its max_args.

use crate::binding::{Binding, CompletionBinding};
use crate::sender::Sender;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct TrieNode {
    binding: Option<Binding>,
    completion: Option<CompletionBinding>,
    children: BTreeMap<String, TrieNode>,
}

/// Successful walk: the binding plus the argument tail it receives
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub binding: &'a Binding,
    pub args: &'a [String],
    /// Path tokens consumed below the node the walk started from
    pub depth: usize,
}

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn completion(&self) -> Option<&CompletionBinding> {
        self.completion.as_ref()
    }

    pub fn child(&self, token: &str) -> Option<&TrieNode> {
        self.children.get(token)
    }

    /// Child tokens in sorted order
    pub fn child_keys(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    // ========================================================================
    // INSERTION
    // ========================================================================

    /// Attach `binding` at `path` below this node, creating nodes as needed.
    /// An occupied node is only taken over by a strictly heavier binding.
    /// Returns whether the binding was kept.
    pub fn insert(&mut self, path: &[String], binding: Binding) -> bool {
        match path.split_first() {
            None => match &self.binding {
                Some(existing) if binding.weight <= existing.weight => {
                    log::debug!(
                        "Dropped binding {:?} (weight {}): node held by weight {}",
                        binding.path, binding.weight, existing.weight
                    );
                    false
                }
                _ => {
                    self.binding = Some(binding);
                    true
                }
            },
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(rest, binding),
        }
    }

    /// Attach a completion at `path`. Last insertion wins.
    pub fn insert_completion(&mut self, path: &[String], completion: CompletionBinding) {
        match path.split_first() {
            None => self.completion = Some(completion),
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert_completion(rest, completion),
        }
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// Walk `tokens` from this node. `None` means nothing matched.
    pub fn resolve<'a>(&'a self, tokens: &'a [String]) -> Option<Match<'a>> {
        self.resolve_at(tokens, 0)
    }

    fn resolve_at<'a>(&'a self, tokens: &'a [String], depth: usize) -> Option<Match<'a>> {
        if let Some(binding) = &self.binding {
            if tokens.len() <= binding.max_args {
                return Some(Match { binding, args: tokens, depth });
            }
        }
        let (head, rest) = tokens.split_first()?;
        self.children.get(head)?.resolve_at(rest, depth + 1)
    }

    // ========================================================================
    // COMPLETION
    // ========================================================================

    /// Suggestions for `tokens`, where the last token is the one being typed.
    ///
    /// At the last token: the bound completer's output, or the child keys when
    /// no completer is bound. `None` when the typed prefix leaves the trie, the
    /// sender lacks the completion permission, or the completer fails.
    pub fn complete(&self, tokens: &[String], sender: &dyn Sender) -> Option<Vec<String>> {
        if tokens.len() <= 1 {
            return match &self.completion {
                Some(completion) => {
                    if !completion.permits(sender) {
                        log::debug!(
                            "Completion {:?} hidden from {}: lacks '{}'",
                            completion.path, sender.name(), completion.permission
                        );
                        return None;
                    }
                    match completion.invoke(sender, tokens) {
                        Ok(items) => Some(items),
                        Err(reason) => {
                            log::error!("Completion {:?} failed: {}", completion.path, reason);
                            None
                        }
                    }
                }
                None => Some(self.child_keys()),
            };
        }
        let (head, rest) = tokens.split_first()?;
        self.children.get(head)?.complete(rest, sender)
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    /// Read-only projection of this node and everything below it
    pub fn export(&self) -> NodeExport {
        NodeExport {
            binding: self.binding.as_ref().map(|b| BindingExport {
                permission: b.permission.clone(),
                weight: b.weight,
                max_args: b.max_args,
            }),
            completion: self.completion.as_ref().map(|c| CompletionExport {
                permission: c.permission.clone(),
                priority: c.priority,
            }),
            children: self
                .children
                .iter()
                .map(|(token, node)| (token.clone(), node.export()))
                .collect(),
        }
    }

    /// Number of nodes in this subtree, this node included
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(TrieNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingExport {
    pub permission: String,
    pub weight: i32,
    pub max_args: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionExport {
    pub permission: String,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionExport>,
    pub children: BTreeMap<String, NodeExport>,
}

// ============================================================================
// TESTS
// ============================================================================
