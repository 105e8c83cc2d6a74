// SPF Command Gate - Command Groups
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// A group bundles bindings under a shared base path (parent path + name).
// The group's main handler sits at the base path itself and is required;
// a group-level completer is optional. Member paths are relative to the base.

use crate::binding::{Binding, BindingSpec, Completer, CompletionBinding, CompletionSpec, Handler};
use crate::error::BuildError;

/// Priority given to a group's own completer
pub const GROUP_COMPLETION_PRIORITY: i32 = 100;

pub struct CommandGroup {
    name: String,
    path: Vec<String>,
    permission: String,
    weight: i32,
    max_args: usize,
    main: Option<Handler>,
    completer: Option<Completer>,
    commands: Vec<(BindingSpec, Handler)>,
    completions: Vec<(CompletionSpec, Completer)>,
}

/// Flattened output of a group, every path absolute
#[derive(Debug)]
pub struct GroupBindings {
    pub bindings: Vec<Binding>,
    pub completions: Vec<CompletionBinding>,
}

impl CommandGroup {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: Vec::new(),
            permission: String::new(),
            weight: 0,
            max_args: 0,
            main: None,
            completer: None,
            commands: Vec::new(),
            completions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn under(mut self, path: &[&str]) -> Self {
        self.path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the parent path from owned tokens
    pub fn under_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Permission guarding the main handler and the group completer
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

    pub fn main(mut self, handler: Handler) -> Self {
        self.main = Some(handler);
        self
    }

    pub fn completer(mut self, completer: Completer) -> Self {
        self.completer = Some(completer);
        self
    }

    /// Member command, path relative to the group base
    pub fn command(mut self, spec: BindingSpec, handler: Handler) -> Self {
        self.commands.push((spec, handler));
        self
    }

    pub fn completion(mut self, spec: CompletionSpec, completer: Completer) -> Self {
        self.completions.push((spec, completer));
        self
    }

    pub fn base_path(&self) -> Vec<String> {
        let mut base = self.path.clone();
        base.push(self.name.clone());
        base
    }

    /// Flatten into absolute bindings. A group without a main handler is rejected.
    pub fn into_bindings(self) -> Result<GroupBindings, BuildError> {
        let base = self.base_path();
        let main = self
            .main
            .ok_or_else(|| BuildError::misconfigured(&base, format!("group '{}' has no main handler", self.name)))?;

        let mut bindings = Vec::with_capacity(self.commands.len() + 1);
        bindings.push(Binding::new(
            &BindingSpec {
                path: self.path.clone(),
                name: self.name.clone(),
                permission: self.permission.clone(),
                weight: self.weight,
                max_args: self.max_args,
            },
            main,
        ));
        for (spec, handler) in self.commands {
            let spec = BindingSpec { path: [base.clone(), spec.path].concat(), ..spec };
            bindings.push(Binding::new(&spec, handler));
        }

        let mut completions = Vec::with_capacity(self.completions.len() + 1);
        if let Some(completer) = self.completer {
            completions.push(CompletionBinding::new(
                &CompletionSpec {
                    path: self.path,
                    name: self.name,
                    permission: self.permission,
                    priority: GROUP_COMPLETION_PRIORITY,
                },
                completer,
            ));
        }
        for (spec, completer) in self.completions {
            let spec = CompletionSpec { path: [base.clone(), spec.path].concat(), ..spec };
            completions.push(CompletionBinding::new(&spec, completer));
        }

        Ok(GroupBindings { bindings, completions })
    }
}

// ============================================================================
// TESTS
// ============================================================================
