//! Handler registration and loading.
//!
//! Handlers are registered up front under a normalized command path. The
//! [`PluginLoader`] resolves a list of command-line tokens against the
//! [`CommandTree`] to a leaf, then looks the leaf's key up in the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{HandlerError, Result, ShellError};
use crate::session::Session;
use crate::tree::{CommandTree, LeafInfo};

/// A constructed command, executed once and then dropped.
#[async_trait]
pub trait CommandHandler: Send {
    /// Run the command. `Ok(None)` means the display is left untouched.
    async fn execute(&mut self) -> std::result::Result<Option<String>, HandlerError>;
}

/// What a handler factory receives.
#[derive(Clone)]
pub struct HandlerContext {
    /// The full token list of the command line.
    pub tokens: Vec<String>,
    /// Number of leading tokens that named the handler.
    pub path_len: usize,
    /// Session the handler may display to or start background tasks on.
    pub session: Session,
}

impl HandlerContext {
    /// Tokens after the command path, for the handler's own parsing.
    pub fn args(&self) -> &[String] {
        self.tokens.get(self.path_len..).unwrap_or_default()
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("tokens", &self.tokens)
            .field("path_len", &self.path_len)
            .finish_non_exhaustive()
    }
}

/// Builds a handler for one invocation.
pub type HandlerFactory = Arc<
    dyn Fn(HandlerContext) -> std::result::Result<Box<dyn CommandHandler>, HandlerError>
        + Send
        + Sync,
>;

/// Normalize a command path: `/watch//kill/` becomes `watch/kill`.
pub fn normalize_key(key: &str) -> String {
    key.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lookup table from command path to handler factory.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `key`, replacing any previous one.
    pub fn register<F>(&mut self, key: &str, factory: F)
    where
        F: Fn(HandlerContext) -> std::result::Result<Box<dyn CommandHandler>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        let key = normalize_key(key);
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            tracing::debug!(key = %key, "replaced handler registration");
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, key: &str, factory: F) -> Self
    where
        F: Fn(HandlerContext) -> std::result::Result<Box<dyn CommandHandler>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register(key, factory);
        self
    }

    /// Get the factory for `key`.
    pub fn get(&self, key: &str) -> Option<HandlerFactory> {
        self.factories.get(&normalize_key(key)).cloned()
    }

    /// Check if a factory is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(&normalize_key(key))
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

/// A located handler, ready to be constructed.
pub struct LoadedHandler {
    /// The leaf that was reached.
    pub leaf: LeafInfo,
    /// How many tokens were consumed to reach it.
    pub path_len: usize,
    factory: HandlerFactory,
}

impl LoadedHandler {
    /// Construct the handler for one invocation.
    pub fn instantiate(
        &self,
        tokens: Vec<String>,
        session: Session,
    ) -> Result<Box<dyn CommandHandler>> {
        let ctx = HandlerContext {
            tokens,
            path_len: self.path_len,
            session,
        };
        (self.factory)(ctx).map_err(|e| ShellError::HandlerLoadError {
            key: self.leaf.key.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for LoadedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedHandler")
            .field("leaf", &self.leaf)
            .field("path_len", &self.path_len)
            .finish_non_exhaustive()
    }
}

/// Resolves command paths to handler factories.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    tree: Arc<CommandTree>,
    registry: HandlerRegistry,
}

impl PluginLoader {
    /// Create a loader over an already built tree.
    pub fn new(tree: Arc<CommandTree>, registry: HandlerRegistry) -> Self {
        Self { tree, registry }
    }

    /// The tree this loader resolves against.
    pub fn tree(&self) -> &Arc<CommandTree> {
        &self.tree
    }

    /// The registry this loader resolves into.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Walk `segments` from the root until a leaf is found.
    ///
    /// The first leaf wins; segments after it are left to the handler.
    pub fn load<S: AsRef<str>>(&self, segments: &[S]) -> Result<LoadedHandler> {
        let mut node = self.tree.root();
        for (i, segment) in segments.iter().enumerate() {
            let Some(child) = node.child(segment.as_ref()) else {
                break;
            };
            node = child;
            if let Some(leaf) = node.leaf() {
                return self.bind(leaf, i + 1);
            }
        }

        Err(ShellError::HandlerNotFound {
            path: segments
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(" "),
        })
    }

    fn bind(&self, leaf: &LeafInfo, path_len: usize) -> Result<LoadedHandler> {
        if let Some(reason) = &leaf.unit_error {
            return Err(ShellError::HandlerLoadError {
                key: leaf.key.clone(),
                reason: reason.clone(),
            });
        }

        let factory = self
            .registry
            .get(&leaf.key)
            .ok_or_else(|| ShellError::HandlerLoadError {
                key: leaf.key.clone(),
                reason: "no handler registered".to_string(),
            })?;

        tracing::trace!(key = %leaf.key, path_len, "loaded handler");
        Ok(LoadedHandler {
            leaf: leaf.clone(),
            path_len,
            factory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(Vec<String>);

    #[async_trait]
    impl CommandHandler for Echo {
        async fn execute(&mut self) -> std::result::Result<Option<String>, HandlerError> {
            Ok(Some(self.0.join(",")))
        }
    }

    fn echo_factory(ctx: HandlerContext) -> std::result::Result<Box<dyn CommandHandler>, HandlerError> {
        Ok(Box::new(Echo(ctx.args().to_vec())))
    }

    fn loader(keys: &[&str], registry: HandlerRegistry) -> PluginLoader {
        PluginLoader::new(Arc::new(CommandTree::from_keys(keys)), registry)
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("/watch//kill/"), "watch/kill");
        assert_eq!(normalize_key("test"), "test");
        assert_eq!(normalize_key("///"), "");
    }

    #[test]
    fn test_registry_basics() {
        let registry = HandlerRegistry::new()
            .with("watch/kill", echo_factory)
            .with("/test/", echo_factory);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("test"));
        assert!(registry.get("watch/kill/").is_some());
        assert!(registry.get("watch").is_none());
        assert_eq!(registry.keys(), vec!["test", "watch/kill"]);
    }

    #[test]
    fn test_load_first_leaf_wins() {
        let registry = HandlerRegistry::new().with("watch/kill", echo_factory);
        let loader = loader(&["watch/kill"], registry);

        let loaded = loader.load(&["watch", "kill", "extra", "args"]).unwrap();
        assert_eq!(loaded.leaf.key, "watch/kill");
        assert_eq!(loaded.path_len, 2);
    }

    #[test]
    fn test_load_not_found() {
        let loader = loader(&["watch/kill"], HandlerRegistry::new());

        let err = loader.load(&["watch", "nope"]).unwrap_err();
        assert!(matches!(err, ShellError::HandlerNotFound { ref path } if path == "watch nope"));

        let err = loader.load::<&str>(&[]).unwrap_err();
        assert!(matches!(err, ShellError::HandlerNotFound { .. }));
    }

    #[test]
    fn test_load_unregistered_leaf() {
        let loader = loader(&["watch/kill"], HandlerRegistry::new());

        let err = loader.load(&["watch", "kill"]).unwrap_err();
        assert!(matches!(err, ShellError::HandlerLoadError { ref key, .. } if key == "watch/kill"));
    }

    #[tokio::test]
    async fn test_instantiate_failure_is_load_error() {
        let registry = HandlerRegistry::new().with("bad", |_ctx| {
            Err(HandlerError::InvalidArguments("nope".to_string()))
        });
        let loader = loader(&["bad"], registry);
        let loaded = loader.load(&["bad"]).unwrap();

        let session = Session::detached();
        let err = loaded
            .instantiate(vec!["bad".to_string()], session)
            .err()
            .unwrap();
        assert!(err.to_string().contains("invalid arguments: nope"));
    }

    #[tokio::test]
    async fn test_instantiate_and_execute() {
        let registry = HandlerRegistry::new().with("test", echo_factory);
        let loader = loader(&["test"], registry);
        let loaded = loader.load(&["test", "a", "b"]).unwrap();

        let tokens = vec!["test".to_string(), "a".to_string(), "b".to_string()];
        let mut handler = loaded.instantiate(tokens, Session::detached()).unwrap();
        assert_eq!(handler.execute().await.unwrap(), Some("a,b".to_string()));
    }
}
