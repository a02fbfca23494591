//! The command tree.
//!
//! Built once at startup, either by walking a command root directory or from
//! the keys of a [`HandlerRegistry`](crate::HandlerRegistry), and never
//! mutated afterwards. Drives tab completion, `?` listings and dispatch.
//!
//! # Directory convention
//!
//! ```text
//! commands/
//!   commands.batch           # optional startup batch
//!   watch/
//!     site-status/
//!       command.toml         # handler unit: makes this directory a leaf
//!     kill/
//!       command.toml
//!   __scratch/               # reserved prefix: never part of the tree
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::registry::normalize_key;

/// Names starting with this prefix are excluded from the tree.
pub const RESERVED_PREFIX: &str = "__";

/// File whose presence turns a directory into a leaf.
pub const HANDLER_UNIT_FILE: &str = "command.toml";

/// Contents of a handler unit file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerUnit {
    /// Registry key of the handler, when it differs from the directory path.
    pub handler: Option<String>,
    /// One-line description shown in listings.
    pub description: Option<String>,
}

/// What a leaf node resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafInfo {
    /// Normalized registry key (`watch/site-status`).
    pub key: String,
    /// Description from the handler unit, if any.
    pub description: Option<String>,
    /// Set when the handler unit file exists but could not be parsed.
    pub unit_error: Option<String>,
}

/// A node of the command tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    name: String,
    children: BTreeMap<String, CommandNode>,
    leaf: Option<LeafInfo>,
}

impl CommandNode {
    fn interior(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: BTreeMap::new(),
            leaf: None,
        }
    }

    fn leaf_node(name: impl Into<String>, info: LeafInfo) -> Self {
        Self {
            name: name.into(),
            children: BTreeMap::new(),
            leaf: Some(info),
        }
    }

    /// Node name (one command-path segment).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an immediate child by name.
    pub fn child(&self, name: &str) -> Option<&CommandNode> {
        self.children.get(name)
    }

    /// Immediate children, ordered by name.
    pub fn children(&self) -> impl Iterator<Item = &CommandNode> {
        self.children.values()
    }

    /// Names of the immediate children, ordered.
    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    /// Whether this node has any children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether dispatch terminates at this node.
    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    /// Leaf details, if this node is a leaf.
    pub fn leaf(&self) -> Option<&LeafInfo> {
        self.leaf.as_ref()
    }

    fn depth(&self) -> usize {
        self.children
            .values()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafInfo>) {
        if let Some(leaf) = &self.leaf {
            out.push(leaf);
        }
        for child in self.children.values() {
            child.collect_leaves(out);
        }
    }
}

/// Immutable command hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTree {
    root: CommandNode,
    root_path: Option<PathBuf>,
}

impl CommandTree {
    /// Build the tree by walking `root`.
    ///
    /// Never fails: an unreadable root yields an empty tree and unreadable
    /// subtrees are omitted.
    pub fn build(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut segments = Vec::new();
        let root_node = walk(root, &name, &mut segments).unwrap_or_else(|| {
            tracing::warn!(root = %root.display(), "command root is not readable, tree is empty");
            CommandNode::interior(name.clone())
        });

        let tree = Self {
            root: root_node,
            root_path: Some(root.to_path_buf()),
        };
        tracing::debug!(
            root = %root.display(),
            leaves = tree.leaves().len(),
            depth = tree.depth(),
            "built command tree"
        );
        tree
    }

    /// Build the tree from handler keys such as `watch/site-status`.
    ///
    /// A key that lies below another key's leaf is ignored.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<String> = keys
            .into_iter()
            .map(|k| normalize_key(k.as_ref()))
            .filter(|k| !k.is_empty())
            .collect();

        let mut root = CommandNode::interior("");
        'keys: for key in sorted {
            let mut node = &mut root;
            for segment in key.split('/') {
                if segment.starts_with(RESERVED_PREFIX) {
                    continue 'keys;
                }
                if node.is_leaf() {
                    tracing::debug!(key = %key, "key shadowed by a shorter leaf, ignoring");
                    continue 'keys;
                }
                node = node
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(|| CommandNode::interior(segment));
            }
            node.children.clear();
            node.leaf = Some(LeafInfo {
                key: key.clone(),
                description: None,
                unit_error: None,
            });
        }

        Self {
            root,
            root_path: None,
        }
    }

    /// The root node.
    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    /// Directory the tree was built from, if any.
    pub fn root_path(&self) -> Option<&Path> {
        self.root_path.as_deref()
    }

    /// Find the node at `path`, starting from the root.
    pub fn node<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandNode> {
        path.iter()
            .try_fold(&self.root, |node, segment| node.child(segment.as_ref()))
    }

    /// Child names of the node at `path`; `None` if the path does not exist.
    pub fn children_of<S: AsRef<str>>(&self, path: &[S]) -> Option<Vec<String>> {
        self.node(path).map(CommandNode::child_names)
    }

    /// Every leaf in the tree, depth first.
    pub fn leaves(&self) -> Vec<&LeafInfo> {
        let mut out = Vec::new();
        self.root.collect_leaves(&mut out);
        out
    }

    /// Length of the longest path from the root.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Completion candidates for the last word of `line`.
    ///
    /// Earlier words walk the tree; a word that does not match stops
    /// completion. A trailing space means the next word is being started.
    pub fn complete(&self, line: &str) -> Vec<String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let starting_word = line.is_empty() || line.ends_with(char::is_whitespace);
        let (done, partial) = match words.split_last() {
            Some((last, rest)) if !starting_word => (rest, *last),
            _ => (&words[..], ""),
        };

        let Some(node) = self.node(done) else {
            return Vec::new();
        };

        node.children
            .keys()
            .filter(|name| name.starts_with(partial))
            .cloned()
            .collect()
    }
}

fn walk(dir: &Path, name: &str, segments: &mut Vec<String>) -> Option<CommandNode> {
    let unit_path = dir.join(HANDLER_UNIT_FILE);
    if !segments.is_empty() && unit_path.is_file() {
        return Some(CommandNode::leaf_node(name, read_leaf(&unit_path, segments)));
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable command directory");
            return None;
        }
    };

    let mut node = CommandNode::interior(name);
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(child_name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if child_name.starts_with(RESERVED_PREFIX) || child_name.starts_with('.') {
            continue;
        }

        segments.push(child_name.clone());
        let child = walk(&path, &child_name, segments);
        segments.pop();

        if let Some(child) = child {
            node.children.insert(child_name, child);
        }
    }
    Some(node)
}

fn read_leaf(unit_path: &Path, segments: &[String]) -> LeafInfo {
    let default_key = segments.join("/");
    let parsed = std::fs::read_to_string(unit_path)
        .map_err(|e| e.to_string())
        .and_then(|contents| toml::from_str::<HandlerUnit>(&contents).map_err(|e| e.to_string()));

    match parsed {
        Ok(unit) => LeafInfo {
            key: unit
                .handler
                .map(|h| normalize_key(&h))
                .filter(|h| !h.is_empty())
                .unwrap_or(default_key),
            description: unit.description,
            unit_error: None,
        },
        Err(reason) => {
            tracing::warn!(unit = %unit_path.display(), error = %reason, "invalid handler unit");
            LeafInfo {
                key: default_key,
                description: None,
                unit_error: Some(reason),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn leaf_dir(root: &Path, rel: &str, unit: &str) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(HANDLER_UNIT_FILE), unit).unwrap();
    }

    fn sample_root() -> TempDir {
        let tmp = TempDir::new().unwrap();
        leaf_dir(tmp.path(), "watch/site-status", "description = \"site view\"\n");
        leaf_dir(tmp.path(), "watch/kill", "");
        leaf_dir(tmp.path(), "test", "");
        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        fs::create_dir_all(tmp.path().join("__pycache__/deep")).unwrap();
        fs::create_dir_all(tmp.path().join("watch/__hidden")).unwrap();
        tmp
    }

    #[test]
    fn test_build_walks_directories() {
        let tmp = sample_root();
        let tree = CommandTree::build(tmp.path());

        assert_eq!(tree.root().child_names(), vec!["empty", "test", "watch"]);
        let watch = tree.node(&["watch"]).unwrap();
        assert_eq!(watch.child_names(), vec!["kill", "site-status"]);
        assert_eq!(
            tree.children_of(&["watch"]),
            Some(vec!["kill".to_string(), "site-status".to_string()])
        );
        assert_eq!(tree.children_of(&["watch", "kill"]), Some(Vec::new()));
        assert_eq!(tree.children_of(&["nope"]), None);
        assert!(!watch.is_leaf());

        let site = tree.node(&["watch", "site-status"]).unwrap();
        let leaf = site.leaf().unwrap();
        assert_eq!(leaf.key, "watch/site-status");
        assert_eq!(leaf.description.as_deref(), Some("site view"));
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_reserved_prefix_excluded() {
        let tmp = sample_root();
        let tree = CommandTree::build(tmp.path());

        assert!(tree.node(&["__pycache__"]).is_none());
        assert!(tree.node(&["watch", "__hidden"]).is_none());
        assert!(tree.complete("").iter().all(|n| !n.starts_with("__")));
        assert!(tree.complete("watch ").iter().all(|n| !n.starts_with("__")));
    }

    #[test]
    fn test_leaf_is_not_descended() {
        let tmp = sample_root();
        fs::create_dir_all(tmp.path().join("test/inner")).unwrap();
        let tree = CommandTree::build(tmp.path());

        let test = tree.node(&["test"]).unwrap();
        assert!(test.is_leaf());
        assert!(!test.has_children());
    }

    #[test]
    fn test_unit_handler_override_and_error() {
        let tmp = TempDir::new().unwrap();
        leaf_dir(tmp.path(), "alias", "handler = \"/watch/kill/\"\n");
        leaf_dir(tmp.path(), "broken", "handler = [\n");
        let tree = CommandTree::build(tmp.path());

        assert_eq!(tree.node(&["alias"]).unwrap().leaf().unwrap().key, "watch/kill");
        let broken = tree.node(&["broken"]).unwrap().leaf().unwrap();
        assert_eq!(broken.key, "broken");
        assert!(broken.unit_error.is_some());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let tree = CommandTree::build(&tmp.path().join("nope"));
        assert!(!tree.root().has_children());
        assert!(tree.leaves().is_empty());
    }

    #[test]
    fn test_from_keys() {
        let tree = CommandTree::from_keys(["watch/kill", "/watch/counter", "test", "test/shadowed", "__x/y"]);

        assert_eq!(tree.root().child_names(), vec!["test", "watch"]);
        assert!(tree.node(&["test"]).unwrap().is_leaf());
        assert!(tree.node(&["test", "shadowed"]).is_none());
        assert_eq!(
            tree.node(&["watch", "counter"]).unwrap().leaf().unwrap().key,
            "watch/counter"
        );
        assert!(tree.root_path().is_none());
    }

    #[test]
    fn test_complete() {
        let tree = CommandTree::from_keys(["watch/kill", "watch/counter", "watch/site-status", "test"]);

        assert_eq!(tree.complete(""), vec!["test", "watch"]);
        assert_eq!(tree.complete("w"), vec!["watch"]);
        assert_eq!(tree.complete("watch "), vec!["counter", "kill", "site-status"]);
        assert_eq!(tree.complete("watch k"), vec!["kill"]);
        assert!(tree.complete("nope ").is_empty());
        assert!(tree.complete("test ").is_empty());
    }
}
