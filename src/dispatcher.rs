// SPF Command Gate - Dispatcher (Primary Routing Point)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every command passes through here. Main command -> trie -> registry.
// Runtime failures (not found, forbidden, handler error) never escape:
// each is logged, reported to the sender, and folded into a DispatchReport.
// The trie is built once by DispatcherBuilder and only read afterwards.

use crate::binding::{
    validate_path, Binding, BindingSpec, Completer, CompletionBinding, CompletionSpec, Handler,
};
use crate::config::RouterConfig;
use crate::error::{BuildError, DispatchError};
use crate::group::CommandGroup;
use crate::node::{BindingExport, CompletionExport, NodeExport, TrieNode};
use crate::registry::{dotted, HandlerFactory, Registry};
use crate::sender::Sender;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Dispatch report: the final word on what happened to a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    /// Dotted path of the handler that ran, or of the input when nothing matched
    pub path: String,
    pub args: Vec<String>,
    pub error: Option<DispatchError>,
    pub message: String,
}

impl DispatchReport {
    fn executed(path: String, args: &[String]) -> Self {
        let message = format!("EXECUTED | {} | {} args", display_path(&path), args.len());
        Self { success: true, path, args: args.to_vec(), error: None, message }
    }

    fn failed(path: String, args: &[String], error: DispatchError) -> Self {
        let message = format!("{} | {} | {}", error.label(), display_path(&path), error);
        Self { success: false, path, args: args.to_vec(), error: Some(error), message }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "(main)" } else { path }
}

/// Split a raw command line into tokens
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects bindings, groups and handler classes, then builds the trie once
pub struct DispatcherBuilder {
    name: String,
    config: RouterConfig,
    main: Option<Binding>,
    main_completion: Option<CompletionBinding>,
    bindings: Vec<Binding>,
    completions: Vec<CompletionBinding>,
    groups: Vec<CommandGroup>,
    registry: Registry,
    errors: Vec<BuildError>,
}

impl DispatcherBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: RouterConfig::default(),
            main: None,
            main_completion: None,
            bindings: Vec::new(),
            completions: Vec::new(),
            groups: Vec::new(),
            registry: Registry::new(),
            errors: Vec::new(),
        }
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Top-level handler, run when the whole input fits `max_args`
    pub fn main(mut self, permission: &str, max_args: usize, handler: Handler) -> Self {
        self.main = Some(Binding {
            path: Vec::new(),
            target: handler,
            permission: permission.to_string(),
            weight: 0,
            max_args,
        });
        self
    }

    /// Suggestions offered alongside the root tokens
    pub fn main_completer(mut self, permission: &str, completer: Completer) -> Self {
        self.main_completion = Some(CompletionBinding {
            path: Vec::new(),
            target: completer,
            permission: permission.to_string(),
            priority: 0,
        });
        self
    }

    pub fn command(mut self, spec: BindingSpec, handler: Handler) -> Self {
        self.bindings.push(Binding::new(&spec, handler));
        self
    }

    pub fn completion(mut self, spec: CompletionSpec, completer: Completer) -> Self {
        self.completions.push(CompletionBinding::new(&spec, completer));
        self
    }

    /// Add a group. A second group at the same base path is ignored.
    pub fn group(mut self, group: CommandGroup) -> Self {
        let base = group.base_path();
        if self.groups.iter().any(|g| g.base_path() == base) {
            log::warn!("Ignoring already registered command group: {}", base.join(" "));
            return self;
        }
        self.groups.push(group);
        self
    }

    /// Register a lazily built handler object at `path`
    pub fn handler_class(mut self, path: &[&str], factory: HandlerFactory) -> Self {
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        if let Err(e) = self.registry.register(&path, factory) {
            self.errors.push(e);
        }
        self
    }

    /// Validate every declaration and build the trie
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let mut bindings = self.bindings;
        let mut completions = self.completions;
        for group in self.groups {
            let flat = group.into_bindings()?;
            bindings.extend(flat.bindings);
            completions.extend(flat.completions);
        }

        let mut roots: BTreeMap<String, TrieNode> = BTreeMap::new();
        let total = bindings.len();
        let mut dropped = 0usize;

        for binding in bindings {
            validate_path(&binding.path)?;
            let path = binding.path.clone();
            log::debug!("Inserting command({}): {}", path.len(), path.join(" "));
            let kept = roots
                .entry(path[0].clone())
                .or_default()
                .insert(&path[1..], binding);
            if !kept {
                dropped += 1;
            }
        }

        for completion in completions {
            validate_path(&completion.path)?;
            let path = completion.path.clone();
            log::debug!("Inserting completion({}): {}", path.len(), path.join(" "));
            roots
                .entry(path[0].clone())
                .or_default()
                .insert_completion(&path[1..], completion);
        }

        if let Some(token) = self.registry.root_tokens().into_iter().find(|t| roots.contains_key(t)) {
            return Err(BuildError::misconfigured(
                &[token],
                "path is routed by both the command trie and the handler registry",
            ));
        }

        let nodes: usize = roots.values().map(TrieNode::node_count).sum();
        log::info!(
            "Dispatcher '{}' built: {} roots, {} nodes, {} bindings ({} dropped by weight), {} handler classes",
            self.name, roots.len(), nodes, total, dropped, self.registry.len()
        );

        Ok(Dispatcher {
            name: self.name,
            config: self.config,
            main: self.main,
            main_completion: self.main_completion,
            roots,
            registry: self.registry,
        })
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Read-only command router. Safe to share across threads.
pub struct Dispatcher {
    name: String,
    config: RouterConfig,
    main: Option<Binding>,
    main_completion: Option<CompletionBinding>,
    roots: BTreeMap<String, TrieNode>,
    registry: Registry,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("roots", &self.roots.keys().collect::<Vec<_>>())
            .field("registry", &self.registry.paths())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn builder(name: &str) -> DispatcherBuilder {
        DispatcherBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Root tokens of the trie and the registry, sorted
    pub fn root_keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.roots.keys().cloned().collect();
        keys.extend(self.registry.root_tokens());
        keys.into_iter().collect()
    }

    /// Trie lookup without permission checks or invocation
    pub fn resolve<'a>(&'a self, tokens: &'a [String]) -> Option<&'a Binding> {
        let (head, rest) = tokens.split_first()?;
        self.roots.get(head)?.resolve(rest).map(|m| m.binding)
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Route a command line
    pub fn dispatch_line(&self, sender: &dyn Sender, line: &str) -> DispatchReport {
        self.dispatch(sender, &tokenize(line))
    }

    /// Route `tokens` and run the matching handler.
    ///
    /// Order:
    /// 1. Main command, when the whole input fits its max_args
    /// 2. Trie, keyed by the first token
    /// 3. Handler registry, only when no trie root matches the first token
    pub fn dispatch(&self, sender: &dyn Sender, tokens: &[String]) -> DispatchReport {
        log::debug!("Dispatching for {}: {}", sender.name(), tokens.join(" "));

        if let Some(main) = &self.main {
            if tokens.len() <= main.max_args {
                return self.run(sender, main, String::new(), tokens);
            }
        }

        let Some((head, rest)) = tokens.split_first() else {
            sender.send_message(&self.config.messages.provide_command(&self.root_keys()));
            return DispatchReport::failed(
                String::new(),
                tokens,
                DispatchError::NotFound { path: String::new() },
            );
        };

        if let Some(node) = self.roots.get(head) {
            return match node.resolve(rest) {
                Some(m) => self.run(sender, m.binding, dotted(&tokens[..=m.depth]), m.args),
                None => self.not_found(sender, tokens),
            };
        }

        match self.registry.dispatch(sender, tokens) {
            Some(outcome) => {
                let args = &tokens[outcome.consumed..];
                match outcome.result {
                    Ok(()) => DispatchReport::executed(outcome.key, args),
                    Err(error) => self.fail(sender, outcome.key, args, error),
                }
            }
            None => self.not_found(sender, tokens),
        }
    }

    /// Permission check, then invocation with failure containment
    fn run(&self, sender: &dyn Sender, binding: &Binding, path: String, args: &[String]) -> DispatchReport {
        if !binding.permits(sender) {
            let error = DispatchError::Forbidden { permission: binding.permission.clone() };
            return self.fail(sender, path, args, error);
        }

        match binding.invoke(sender, args) {
            Ok(()) => {
                log::debug!("Executed {} with {} args", display_path(&path), args.len());
                DispatchReport::executed(path, args)
            }
            Err(reason) => self.fail(sender, path, args, DispatchError::HandlerError { reason }),
        }
    }

    fn not_found(&self, sender: &dyn Sender, tokens: &[String]) -> DispatchReport {
        let path = dotted(tokens);
        self.fail(sender, path.clone(), &[], DispatchError::NotFound { path })
    }

    /// Log, notify the sender, and build the failure report
    fn fail(&self, sender: &dyn Sender, path: String, args: &[String], error: DispatchError) -> DispatchReport {
        let messages = &self.config.messages;
        let text = match &error {
            DispatchError::NotFound { .. } => {
                log::debug!("No command for {}: {}", sender.name(), path);
                messages.not_found.clone()
            }
            DispatchError::Forbidden { permission } => {
                log::warn!("{} denied {}: lacks '{}'", sender.name(), display_path(&path), permission);
                messages.forbidden.clone()
            }
            DispatchError::TooManyArgs { max } => messages.too_many_args(*max),
            DispatchError::HandlerError { reason } => {
                log::error!("Handler {} failed for {}: {}", display_path(&path), sender.name(), reason);
                messages.handler_error.clone()
            }
        };
        sender.send_message(&text);
        DispatchReport::failed(path, args, error)
    }

    // ========================================================================
    // COMPLETION
    // ========================================================================

    /// Suggestions for a partially typed line. A trailing space starts a new token.
    pub fn complete_line(&self, sender: &dyn Sender, line: &str) -> Option<Vec<String>> {
        let mut tokens = tokenize(line);
        if line.is_empty() || line.ends_with(char::is_whitespace) {
            tokens.push(String::new());
        }
        self.complete(sender, &tokens)
    }

    /// Suggestions for `tokens`, the last being the token under the cursor.
    /// `None` means the prefix matches nothing; `Some(vec![])` means matched
    /// with nothing to suggest.
    pub fn complete(&self, sender: &dyn Sender, tokens: &[String]) -> Option<Vec<String>> {
        if tokens.len() <= 1 {
            return Some(self.complete_root(sender, tokens));
        }
        let (head, rest) = tokens.split_first()?;

        match self.roots.get(head) {
            Some(node) => node.complete(rest, sender),
            None => self.registry.complete(sender, tokens),
        }
    }

    /// First-token suggestions: every root, then the main completer's output
    fn complete_root(&self, sender: &dyn Sender, tokens: &[String]) -> Vec<String> {
        let mut items = self.root_keys();
        if let Some(completion) = &self.main_completion {
            if completion.permits(sender) {
                match completion.invoke(sender, tokens) {
                    Ok(extra) => items.extend(extra),
                    Err(reason) => log::error!("Main completion failed: {}", reason),
                }
            }
        }
        items
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    /// Diagnostic projection of every route
    pub fn export(&self) -> DispatcherExport {
        DispatcherExport {
            name: self.name.clone(),
            main: self.main.as_ref().map(|b| BindingExport {
                permission: b.permission.clone(),
                weight: b.weight,
                max_args: b.max_args,
            }),
            main_completion: self.main_completion.as_ref().map(|c| CompletionExport {
                permission: c.permission.clone(),
                priority: c.priority,
            }),
            commands: self
                .roots
                .iter()
                .map(|(token, node)| (token.clone(), node.export()))
                .collect(),
            registry: self.registry.paths(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherExport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<BindingExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_completion: Option<CompletionExport>,
    pub commands: BTreeMap<String, NodeExport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub registry: Vec<String>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{completer, handler, suggestions};
    use crate::registry::SubCommandHandler;
    use crate::sender::MemorySender;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn toks(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    /// Handler that records each argument tail it receives
    fn recorder() -> (Handler, Arc<Mutex<Vec<Vec<String>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let h = handler(move |_, args| {
            sink.lock().unwrap().push(args.to_vec());
            Ok(())
        });
        (h, calls)
    }

    /// Handler that replies with a fixed tag
    fn reply(tag: &'static str) -> Handler {
        handler(move |sender, _| {
            sender.send_message(tag);
            Ok(())
        })
    }

    #[test]
    fn bound_path_invoked_with_empty_tail() {
        let (h, calls) = recorder();
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("reload").under(&["admin"]), h)
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch(&sender, &toks(&["admin", "reload"]));
        assert!(report.success, "{}", report.message);
        assert_eq!(report.path, "admin.reload");
        assert_eq!(*calls.lock().unwrap(), vec![Vec::<String>::new()]);
    }

    #[test]
    fn max_args_scenario_matches_then_overflows_to_not_found() {
        let (h, calls) = recorder();
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("one").under(&["sub"]).max_args(2), h)
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch(&sender, &toks(&["sub", "one", "a", "b"]));
        assert!(report.success);
        assert_eq!(report.args, toks(&["a", "b"]));

        let report = dispatcher.dispatch(&sender, &toks(&["sub", "one", "a", "b", "c"]));
        assert!(!report.success);
        assert!(matches!(report.error, Some(DispatchError::NotFound { .. })));
        assert_eq!(calls.lock().unwrap().len(), 1, "overflow must not truncate into the handler");
        assert_eq!(sender.last_message().as_deref(), Some("Command not found"));
    }

    #[test]
    fn unknown_path_is_not_found() {
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("help"), reply("help"))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch_line(&sender, "nothing here");
        assert_eq!(report.error, Some(DispatchError::NotFound { path: "nothing.here".to_string() }));
    }

    #[test]
    fn permission_gates_regardless_of_arg_count() {
        let (h, calls) = recorder();
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("ban").permission("demo.ban").max_args(3), h)
            .build()
            .unwrap();
        let guest = MemorySender::new("guest");
        let op = MemorySender::new("op").with_permission("demo.ban");

        for line in ["ban", "ban x", "ban x y z"] {
            let report = dispatcher.dispatch_line(&guest, line);
            assert_eq!(
                report.error,
                Some(DispatchError::Forbidden { permission: "demo.ban".to_string() }),
                "line '{}'",
                line
            );
        }
        assert!(calls.lock().unwrap().is_empty(), "denied handler must not run");
        assert_eq!(guest.last_message().as_deref(), Some("You don't have permission to use this command."));

        assert!(dispatcher.dispatch_line(&op, "ban x").success);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn weight_tie_break_both_orders() {
        let sender = MemorySender::new("op");

        let heavy_first = Dispatcher::builder("demo")
            .command(BindingSpec::new("x").weight(5), reply("five"))
            .command(BindingSpec::new("x").weight(3), reply("three"))
            .build()
            .unwrap();
        heavy_first.dispatch_line(&sender, "x");
        assert_eq!(sender.last_message().as_deref(), Some("five"));

        let light_first = Dispatcher::builder("demo")
            .command(BindingSpec::new("x").weight(3), reply("three"))
            .command(BindingSpec::new("x").weight(5), reply("five"))
            .build()
            .unwrap();
        light_first.dispatch_line(&sender, "x");
        assert_eq!(sender.last_message().as_deref(), Some("five"));
    }

    #[test]
    fn handler_errors_and_panics_are_contained() {
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("fail"), handler(|_, _| anyhow::bail!("backend down")))
            .command(BindingSpec::new("crash"), handler(|_, _| panic!("index out of range")))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        for line in ["fail", "crash"] {
            let report = dispatcher.dispatch_line(&sender, line);
            assert!(!report.success);
            assert!(matches!(report.error, Some(DispatchError::HandlerError { .. })), "line '{}'", line);
            assert_eq!(sender.last_message().as_deref(), Some("An error occurred while executing the command."));
        }
    }

    #[test]
    fn main_command_takes_short_input() {
        let (main, calls) = recorder();
        let dispatcher = Dispatcher::builder("demo")
            .main("", 1, main)
            .command(BindingSpec::new("help"), reply("help"))
            .command(BindingSpec::new("info").max_args(1), reply("info"))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch(&sender, &[]);
        assert!(report.success);
        assert_eq!(report.path, "");
        let report = dispatcher.dispatch_line(&sender, "help");
        assert!(report.success);
        assert_eq!(*calls.lock().unwrap(), vec![vec![], toks(&["help"])], "one token fits main max_args=1");

        let report = dispatcher.dispatch_line(&sender, "info alice");
        assert_eq!(report.path, "info");
        assert_eq!(sender.last_message().as_deref(), Some("info"));
    }

    #[test]
    fn empty_input_without_main_lists_roots() {
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("help"), reply("help"))
            .command(BindingSpec::new("reload").under(&["admin"]), reply("reload"))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch(&sender, &[]);
        assert!(!report.success);
        assert_eq!(sender.last_message().as_deref(), Some("Please provide a command: [admin, help]"));
    }

    #[test]
    fn repeated_dispatch_is_idempotent() {
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("one").under(&["sub"]).max_args(2), reply("one"))
            .command(BindingSpec::new("ban").permission("demo.ban"), reply("ban"))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        for line in ["sub one a", "sub one a b c", "ban", "missing"] {
            let first = dispatcher.dispatch_line(&sender, line);
            let second = dispatcher.dispatch_line(&sender, line);
            assert_eq!(first, second, "line '{}'", line);
        }
    }

    #[test]
    fn completion_scenarios() {
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("reload").under(&["admin"]), reply("reload"))
            .completion(CompletionSpec::new("admin"), suggestions(["reload", "kick", "ban"]))
            .command(BindingSpec::new("kick").under(&["mod"]), reply("kick"))
            .command(BindingSpec::new("ban").under(&["mod"]), reply("ban"))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        assert_eq!(dispatcher.complete(&sender, &toks(&["admin", ""])), Some(toks(&["reload", "kick", "ban"])));
        assert_eq!(dispatcher.complete(&sender, &toks(&["unknown", ""])), None);
        assert_eq!(dispatcher.complete(&sender, &toks(&["mod", ""])), Some(toks(&["ban", "kick"])));
        assert_eq!(dispatcher.complete_line(&sender, "mod "), Some(toks(&["ban", "kick"])));
    }

    #[test]
    fn root_completion_includes_main_suggestions() {
        let dispatcher = Dispatcher::builder("demo")
            .main("", 0, reply("main"))
            .main_completer("", completer(|_, _| Ok(vec!["--verbose".to_string()])))
            .command(BindingSpec::new("help"), reply("help"))
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        assert_eq!(dispatcher.complete_line(&sender, ""), Some(toks(&["help", "--verbose"])));
        assert_eq!(dispatcher.complete(&sender, &toks(&["he"])), Some(toks(&["help", "--verbose"])));
    }

    struct Ping {
        builds: Arc<AtomicUsize>,
    }

    impl SubCommandHandler for Ping {
        fn execute(&self, sender: &dyn Sender, _args: &[String]) -> anyhow::Result<()> {
            sender.send_message(&format!("pong #{}", self.builds.load(Ordering::SeqCst)));
            Ok(())
        }
    }

    #[test]
    fn registry_is_fallback_after_trie() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("help"), reply("help"))
            .handler_class(
                &["net", "ping"],
                Box::new(move || -> anyhow::Result<Box<dyn SubCommandHandler>> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(Ping { builds: Arc::clone(&counter) }))
                }),
            )
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch_line(&sender, "net ping");
        assert!(report.success, "{}", report.message);
        assert_eq!(report.path, "net.ping");
        dispatcher.dispatch_line(&sender, "net ping");
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let report = dispatcher.dispatch_line(&sender, "net ping extra");
        assert_eq!(report.error, Some(DispatchError::TooManyArgs { max: 0 }));
        assert_eq!(sender.last_message().as_deref(), Some("Too many arguments. Maximum: 0"));

        assert_eq!(dispatcher.root_keys(), toks(&["help", "net"]));
    }

    #[test]
    fn registry_root_colliding_with_trie_is_rejected() {
        let result = Dispatcher::builder("demo")
            .command(BindingSpec::new("reload").under(&["admin"]), reply("reload"))
            .handler_class(&["admin", "ban"], Box::new(|| -> anyhow::Result<Box<dyn SubCommandHandler>> {
                anyhow::bail!("never built")
            }))
            .build();
        assert!(matches!(result, Err(BuildError::MisconfiguredBinding { .. })));
    }

    #[test]
    fn empty_path_is_misconfigured() {
        let result = Dispatcher::builder("demo")
            .command(BindingSpec::new(""), reply("nothing"))
            .build();
        assert!(matches!(result, Err(BuildError::MisconfiguredBinding { .. })));
    }

    #[test]
    fn groups_route_and_complete() {
        let group = CommandGroup::new("mod")
            .permission("demo.mod")
            .main(reply("mod main"))
            .completer(suggestions(["kick", "mute"]))
            .command(BindingSpec::new("kick").max_args(1), reply("kicked"));
        let duplicate = CommandGroup::new("mod").main(reply("duplicate"));
        let dispatcher = Dispatcher::builder("demo").group(group).group(duplicate).build().unwrap();

        let moderator = MemorySender::new("moderator").with_permission("demo.mod");
        dispatcher.dispatch_line(&moderator, "mod");
        assert_eq!(moderator.last_message().as_deref(), Some("mod main"));
        dispatcher.dispatch_line(&moderator, "mod kick alice");
        assert_eq!(moderator.last_message().as_deref(), Some("kicked"));

        let guest = MemorySender::new("guest");
        assert!(!dispatcher.dispatch_line(&guest, "mod").success);
        assert_eq!(dispatcher.complete_line(&moderator, "mod "), Some(toks(&["kick", "mute"])));
        assert_eq!(dispatcher.complete_line(&guest, "mod "), None);
    }

    #[test]
    fn same_named_groups_under_different_parents_both_route() {
        let admin = CommandGroup::new("list").under(&["admin"]).main(reply("admin list"));
        let user = CommandGroup::new("list").under(&["user"]).main(reply("user list"));
        let dispatcher = Dispatcher::builder("demo").group(admin).group(user).build().unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch_line(&sender, "admin list");
        assert!(report.success, "{}", report.message);
        assert_eq!(sender.last_message().as_deref(), Some("admin list"));

        let report = dispatcher.dispatch_line(&sender, "user list");
        assert!(report.success, "{}", report.message);
        assert_eq!(report.path, "user.list");
        assert_eq!(sender.last_message().as_deref(), Some("user list"));
    }

    #[test]
    fn dotted_token_does_not_reach_registry_handler() {
        let dispatcher = Dispatcher::builder("demo")
            .handler_class(
                &["net", "ping"],
                Box::new(|| -> anyhow::Result<Box<dyn SubCommandHandler>> {
                    Ok(Box::new(Ping { builds: Arc::new(AtomicUsize::new(1)) }))
                }),
            )
            .build()
            .unwrap();
        let sender = MemorySender::new("op");

        let report = dispatcher.dispatch_line(&sender, "net.ping");
        assert_eq!(report.error, Some(DispatchError::NotFound { path: "net.ping".to_string() }));
        assert!(dispatcher.dispatch_line(&sender, "net ping").success);
    }

    #[test]
    fn dotted_handler_class_path_is_rejected() {
        let result = Dispatcher::builder("demo")
            .handler_class(&["a.b"], Box::new(|| -> anyhow::Result<Box<dyn SubCommandHandler>> {
                anyhow::bail!("never built")
            }))
            .build();
        assert!(matches!(result, Err(BuildError::MisconfiguredBinding { .. })));
    }

    #[test]
    fn group_without_main_aborts_build() {
        let result = Dispatcher::builder("demo").group(CommandGroup::new("broken")).build();
        assert!(matches!(result, Err(BuildError::MisconfiguredBinding { .. })));
    }

    #[test]
    fn concurrent_dispatch_shares_the_trie() {
        let dispatcher = Dispatcher::builder("demo")
            .command(BindingSpec::new("echo").max_args(4), handler(|sender, args| {
                sender.send_message(&args.join(" "));
                Ok(())
            }))
            .build()
            .unwrap();

        std::thread::scope(|s| {
            for i in 0..8 {
                let dispatcher = &dispatcher;
                s.spawn(move || {
                    let sender = MemorySender::new(&format!("t{}", i));
                    let report = dispatcher.dispatch_line(&sender, &format!("echo {}", i));
                    assert!(report.success);
                    assert_eq!(sender.messages(), vec![i.to_string()]);
                });
            }
        });
    }

    #[test]
    fn export_lists_every_route() {
        let dispatcher = Dispatcher::builder("demo")
            .main("demo.use", 0, reply("main"))
            .command(BindingSpec::new("one").under(&["sub"]).max_args(2).weight(4), reply("one"))
            .completion(CompletionSpec::new("sub").priority(7), suggestions(["one"]))
            .handler_class(&["net", "ping"], Box::new(|| -> anyhow::Result<Box<dyn SubCommandHandler>> {
                anyhow::bail!("unused")
            }))
            .build()
            .unwrap();

        let export = dispatcher.export();
        assert_eq!(export.main.as_ref().map(|m| m.permission.as_str()), Some("demo.use"));
        let sub = &export.commands["sub"];
        assert_eq!(sub.completion.as_ref().map(|c| c.priority), Some(7));
        let one = sub.children["one"].binding.as_ref().unwrap();
        assert_eq!((one.weight, one.max_args), (4, 2));
        assert_eq!(export.registry, vec!["net.ping"]);
        assert_eq!(dispatcher.registry().instantiated(), 0, "export must not construct handlers");

        let json = serde_json::to_value(&export).unwrap();
        assert!(json["commands"]["sub"]["children"]["one"]["binding"].is_object());
    }
}
