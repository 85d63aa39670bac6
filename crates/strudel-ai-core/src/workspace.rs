//! Workspace file helpers: autosave paths, the file tree, naming and API URLs.

use crate::lenient;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

pub const WORKSPACE_EXTENSIONS: [&str; 4] = [".strudel", ".js", ".txt", ".md"];
pub const AUTOSAVE_DIR: &str = "autosaves";

const DEFAULT_WORKSPACE: &str = "workspace";
const UNTITLED_FILE: &str = "untitled.strudel";
const DEFAULT_EXTENSION: &str = ".strudel";

// ═══════════════════════════════════════════════════════════════════════════
// Autosave
// ═══════════════════════════════════════════════════════════════════════════

fn unsafe_chars_re() -> &'static Regex {
    static UNSAFE_RE: OnceLock<Regex> = OnceLock::new();
    UNSAFE_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_.-]+").expect("segment regex should compile"))
}

fn dash_run_re() -> &'static Regex {
    static DASH_RE: OnceLock<Regex> = OnceLock::new();
    DASH_RE.get_or_init(|| Regex::new(r"-+").expect("dash regex should compile"))
}

/// Restrict a path segment to `[A-Za-z0-9_.-]`, collapsing everything else to
/// single dashes and trimming dashes at both ends.
pub fn sanitize_segment(segment: &str) -> String {
    let replaced = unsafe_chars_re().replace_all(segment.trim(), "-");
    let collapsed = dash_run_re().replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Sanitized segment, or `fallback` when nothing usable is left. Dot-only
/// segments (`.`, `..`) would leave the autosave directory.
fn safe_segment(segment: &str, fallback: &str) -> String {
    let safe = sanitize_segment(segment);
    if safe.chars().all(|c| c == '.') {
        fallback.to_string()
    } else {
        safe
    }
}

/// Relative path, under `autosaves/`, where unsaved edits of `file_path` live.
pub fn build_autosave_path(workspace: Option<&str>, file_path: Option<&str>) -> String {
    let workspace = safe_segment(workspace.unwrap_or_default(), DEFAULT_WORKSPACE);

    let raw_path = file_path
        .filter(|path| !path.trim().is_empty())
        .unwrap_or(UNTITLED_FILE);
    let mut parts: Vec<String> = raw_path
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| safe_segment(part, "file"))
        .collect();

    let file_name = parts.pop().unwrap_or_else(|| UNTITLED_FILE.to_string());
    let file_name = if file_name.contains('.') {
        file_name
    } else {
        format!("{file_name}{DEFAULT_EXTENSION}")
    };

    let mut segments = vec![workspace];
    segments.extend(parts);
    segments.push(file_name);
    format!("{AUTOSAVE_DIR}/{}", segments.join("/"))
}

/// Debounce key for autosave writes. Paths that sanitize to the same file
/// share a key.
pub fn autosave_key(workspace: Option<&str>, file_path: Option<&str>) -> String {
    build_autosave_path(workspace, file_path)
}

/// Saved file versus its autosave, with modification times in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveComparison<'a> {
    pub autosave_text: &'a str,
    pub file_text: &'a str,
    pub autosave_modified_ms: Option<i64>,
    pub file_modified_ms: Option<i64>,
}

/// Offer to restore only a non-empty autosave that differs and is strictly newer.
pub fn should_prompt_autosave(comparison: &AutosaveComparison<'_>) -> bool {
    if comparison.autosave_text.is_empty() || comparison.autosave_text == comparison.file_text {
        return false;
    }
    match (comparison.autosave_modified_ms, comparison.file_modified_ms) {
        (Some(autosave), Some(file)) => autosave > file,
        _ => false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Ordering
// ═══════════════════════════════════════════════════════════════════════════

fn split_digit_run(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Case-insensitive comparison that orders embedded numbers by value
/// (`beat2` before `beat10`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        let (Some(ca), Some(cb)) = (a.chars().next(), b.chars().next()) else {
            return a.is_empty().cmp(&b.is_empty()).reverse();
        };
        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (run_a, rest_a) = split_digit_run(a);
            let (run_b, rest_b) = split_digit_run(b);
            match compare_digit_runs(run_a, run_b) {
                Ordering::Equal => {}
                other => return other,
            }
            a = rest_a;
            b = rest_b;
            continue;
        }
        match ca.to_lowercase().cmp(cb.to_lowercase()) {
            Ordering::Equal => {}
            other => return other,
        }
        a = &a[ca.len_utf8()..];
        b = &b[cb.len_utf8()..];
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tree
// ═══════════════════════════════════════════════════════════════════════════

/// A stored workspace file as listed by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceEntry {
    #[serde(deserialize_with = "lenient::string")]
    pub path: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
}

impl WorkspaceEntry {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self { path, name }
    }

    fn sort_key(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<WorkspaceEntry>,
    /// Set by [`filter_workspace_tree`] on nodes that match the query themselves.
    #[serde(default)]
    pub matches: bool,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    fn matches_query(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.path.to_lowercase().contains(needle)
    }
}

struct PendingNode {
    name: String,
    path: String,
    kind: NodeKind,
    entry: Option<WorkspaceEntry>,
    children: BTreeMap<String, PendingNode>,
}

impl PendingNode {
    fn materialize(self) -> TreeNode {
        let mut children: Vec<TreeNode> = self
            .children
            .into_values()
            .map(PendingNode::materialize)
            .collect();
        sort_tree_nodes(&mut children);
        TreeNode {
            name: self.name,
            path: self.path,
            kind: self.kind,
            children,
            entry: self.entry,
            matches: false,
        }
    }
}

/// Directories first, then natural name order.
fn sort_tree_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| natural_cmp(&a.name, &b.name))
    });
}

/// Nest `/`-separated entry paths under a root directory named `root_name`
/// (`workspace` when blank). Entries with empty paths are ignored.
pub fn build_workspace_tree(entries: &[WorkspaceEntry], root_name: &str) -> TreeNode {
    let mut root = PendingNode {
        name: if root_name.is_empty() {
            DEFAULT_WORKSPACE.to_string()
        } else {
            root_name.to_string()
        },
        path: String::new(),
        kind: NodeKind::Directory,
        entry: None,
        children: BTreeMap::new(),
    };

    for entry in entries {
        let parts: Vec<&str> = entry.path.split('/').filter(|part| !part.is_empty()).collect();
        let mut node = &mut root;
        for (index, part) in parts.iter().enumerate() {
            let is_leaf = index + 1 == parts.len();
            let path = if node.path.is_empty() {
                part.to_string()
            } else {
                format!("{}/{}", node.path, part)
            };
            node = node
                .children
                .entry(part.to_string())
                .or_insert_with(|| PendingNode {
                    name: part.to_string(),
                    path,
                    kind: if is_leaf { NodeKind::File } else { NodeKind::Directory },
                    entry: is_leaf.then(|| entry.clone()),
                    children: BTreeMap::new(),
                });
        }
    }

    root.materialize()
}

fn filter_node(node: &TreeNode, needle: &str) -> Option<TreeNode> {
    let matches = node.matches_query(needle);
    if !node.is_dir() {
        return matches.then(|| TreeNode {
            matches: true,
            ..node.clone()
        });
    }
    let children: Vec<TreeNode> = node
        .children
        .iter()
        .filter_map(|child| filter_node(child, needle))
        .collect();
    (matches || !children.is_empty()).then(|| TreeNode {
        name: node.name.clone(),
        path: node.path.clone(),
        kind: node.kind,
        children,
        entry: node.entry.clone(),
        matches,
    })
}

/// Keep files whose name or path contains `query` (case-insensitive) and the
/// directories leading to them. A blank query returns the tree unchanged.
pub fn filter_workspace_tree(tree: &TreeNode, query: &str) -> TreeNode {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tree.clone();
    }
    filter_node(tree, &needle).unwrap_or_else(|| TreeNode {
        children: Vec::new(),
        ..tree.clone()
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Files & URLs
// ═══════════════════════════════════════════════════════════════════════════

pub fn is_supported_workspace_file(name: &str) -> bool {
    let lowered = name.to_lowercase();
    WORKSPACE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// `name` if unused, else `base-2.ext`, `base-3.ext`, ...
pub fn create_unique_filename<I, S>(name: &str, existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let existing: HashSet<String> = existing.into_iter().map(Into::into).collect();
    if !existing.contains(name) {
        return name.to_string();
    }

    let (base, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    (2..)
        .map(|index| format!("{base}-{index}{ext}"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Natural order by path, or by name for entries without one.
pub fn sort_workspace_entries(entries: &mut [WorkspaceEntry]) {
    entries.sort_by(|a, b| natural_cmp(a.sort_key(), b.sort_key()));
}

/// Join a deployment base path (`/`, `/strudel/`, `/strudel`) with an API path.
pub fn build_api_url(base: &str, path: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{base}{path}")
}
