//! Template rendering: `{{TOKEN}}` substitution over a directory tree.
//!
//! Files ending in [`TEMPLATE_SUFFIX`] are rendered to their suffix-less
//! sibling and removed. Every other file is left byte-for-byte untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

/// Reserved file name suffix marking a template.
pub const TEMPLATE_SUFFIX: &str = ".template";

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z0-9_\-]+)\}\}").expect("valid regex"));

/// How to treat tokens that have no mapped value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Unknown tokens become the empty string.
    #[default]
    Lenient,
    /// Unknown tokens fail the render before any file is written.
    Strict,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template tokens: {}", .0.iter().cloned().collect::<Vec<_>>().join(", "))]
    UnknownTokens(BTreeSet<String>),
}

/// Token name to substitution value. Built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements(BTreeMap<String, String>);

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, value: impl Into<String>) -> Self {
        self.0.insert(token.to_string(), value.into());
        self
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitute every token in `content`. Unknown tokens resolve to "".
    pub fn render_str(&self, content: &str) -> String {
        TOKEN
            .replace_all(content, |caps: &Captures| {
                self.get(&caps[1]).unwrap_or_default().to_string()
            })
            .into_owned()
    }

    /// Token names in `content` with no mapped value.
    pub fn unknown_tokens(&self, content: &str) -> BTreeSet<String> {
        TOKEN
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .filter(|token| !self.0.contains_key(token))
            .collect()
    }
}

/// What a tree render did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Rendered output files, relative to the tree root, in visit order.
    pub rendered: Vec<PathBuf>,
    /// Tokens that resolved to the empty string.
    pub unresolved: BTreeSet<String>,
}

/// Render every template file under `root` in place.
///
/// In [`RenderMode::Strict`] all templates are checked first, so a failing
/// render leaves the tree as it was.
pub async fn render_tree(
    root: &Path,
    replacements: &Replacements,
    mode: RenderMode,
) -> Result<RenderReport> {
    let walk_root = root.to_path_buf();
    let templates = tokio::task::spawn_blocking(move || find_templates(&walk_root))
        .await
        .context("template walk panicked")??;

    let mut sources = Vec::with_capacity(templates.len());
    let mut unresolved = BTreeSet::new();
    for path in templates {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        unresolved.extend(replacements.unknown_tokens(&content));
        sources.push((path, content));
    }

    if mode == RenderMode::Strict && !unresolved.is_empty() {
        return Err(TemplateError::UnknownTokens(unresolved).into());
    }

    let mut report = RenderReport {
        rendered: Vec::with_capacity(sources.len()),
        unresolved,
    };
    for (source, content) in sources {
        let destination = strip_suffix(&source);
        tokio::fs::write(&destination, replacements.render_str(&content))
            .await
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        tokio::fs::remove_file(&source)
            .await
            .with_context(|| format!("Failed to remove template {}", source.display()))?;
        tracing::debug!(file = %destination.display(), "rendered template");
        let relative = destination
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or(destination);
        report.rendered.push(relative);
    }

    if !report.unresolved.is_empty() {
        tracing::warn!(
            tokens = ?report.unresolved,
            "template tokens without a value rendered as empty"
        );
    }
    Ok(report)
}

/// Collect template files depth-first, sorted per directory.
fn find_templates(root: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
        let mut entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                walk(&path, result)?;
            } else if is_template(&path) {
                result.push(path);
            }
        }
        Ok(())
    }

    let mut result = Vec::new();
    walk(root, &mut result)?;
    Ok(result)
}

fn is_template(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEMPLATE_SUFFIX))
}

fn strip_suffix(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stripped = name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(name);
    path.with_file_name(stripped)
}
