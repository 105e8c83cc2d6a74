// SPF Command Gate - Manifest
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// JSON command manifest: declares the main command, commands, completions
// and groups with canned behaviour, and turns them into a DispatcherBuilder.
// Used by the CLI to route commands without compiled handlers.

use crate::binding::{handler, suggestions, BindingSpec, CompletionSpec, Handler};
use crate::config::RouterConfig;
use crate::dispatcher::DispatcherBuilder;
use crate::group::CommandGroup;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Canned handler behaviour. `error` wins over `reply`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Message sent back; `{args}` and `{sender}` are substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// Makes the handler fail with this reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Action {
    pub fn to_handler(&self) -> Handler {
        let action = self.clone();
        handler(move |sender, args| {
            if let Some(reason) = &action.error {
                anyhow::bail!("{}", reason);
            }
            if let Some(reply) = &action.reply {
                sender.send_message(&render(reply, sender.name(), args));
            }
            Ok(())
        })
    }
}

fn render(template: &str, sender: &str, args: &[String]) -> String {
    template.replace("{sender}", sender).replace("{args}", &args.join(" "))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainEntry {
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub max_args: usize,
    #[serde(flatten)]
    pub action: Action,
    /// Extra root-level suggestions
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    #[serde(flatten)]
    pub spec: BindingSpec,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    #[serde(flatten)]
    pub spec: CompletionSpec,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub max_args: usize,
    /// Required; a group without one fails to build
    #[serde(default)]
    pub main: Option<Action>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(default)]
    pub completions: Vec<CompletionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub main: Option<MainEntry>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
    #[serde(default)]
    pub completions: Vec<CompletionEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

impl Manifest {
    /// Load a manifest from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        let manifest: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest JSON in {:?}", path))?;
        log::debug!(
            "Loaded manifest '{}': {} commands, {} completions, {} groups",
            manifest.name, manifest.commands.len(), manifest.completions.len(), manifest.groups.len()
        );
        Ok(manifest)
    }

    /// Declare everything in the manifest on a fresh builder
    pub fn into_builder(self, config: RouterConfig) -> DispatcherBuilder {
        let mut builder = DispatcherBuilder::new(&self.name).config(config);

        if let Some(main) = self.main {
            builder = builder.main(&main.permission, main.max_args, main.action.to_handler());
            if !main.suggestions.is_empty() {
                builder = builder.main_completer(&main.permission, suggestions(main.suggestions));
            }
        }
        for entry in self.commands {
            let target = entry.action.to_handler();
            builder = builder.command(entry.spec, target);
        }
        for entry in self.completions {
            builder = builder.completion(entry.spec, suggestions(entry.suggestions));
        }
        for entry in self.groups {
            builder = builder.group(entry.into_group());
        }
        builder
    }
}

impl GroupEntry {
    fn into_group(self) -> CommandGroup {
        let mut group = CommandGroup::new(&self.name)
            .under_path(self.path)
            .permission(&self.permission)
            .weight(self.weight)
            .max_args(self.max_args);
        if let Some(main) = &self.main {
            group = group.main(main.to_handler());
        }
        if let Some(items) = self.suggestions {
            group = group.completer(suggestions(items));
        }
        for entry in self.commands {
            let target = entry.action.to_handler();
            group = group.command(entry.spec, target);
        }
        for entry in self.completions {
            group = group.completion(entry.spec, suggestions(entry.suggestions));
        }
        group
    }
}

// ============================================================================
// TESTS
// ============================================================================
