//! Output project directory for a factory run.
//!
//! The workspace owns the output path for the whole run: it is wiped and
//! recreated on a forced overwrite, seeded from the template root, then
//! rendered in place.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::factory::FactoryError;

/// The generated project on disk.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    /// Create the output directory from `template_root`.
    ///
    /// An existing `root` is a collision unless `force` is set, in which
    /// case it is deleted first.
    pub async fn create(root: &Path, template_root: &Path, force: bool) -> Result<Self> {
        if !tokio::fs::try_exists(template_root).await.unwrap_or(false) {
            return Err(FactoryError::TemplateRootMissing(template_root.to_path_buf()).into());
        }

        if tokio::fs::try_exists(root).await.unwrap_or(false) {
            if !force {
                return Err(FactoryError::OutputExists(root.to_path_buf()).into());
            }
            tracing::info!(output = %root.display(), "removing existing output (--force)");
            remove_path(root).await?;
        }

        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create {}", root.display()))?;

        let from = template_root.to_path_buf();
        let to = root.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&from, &to))
            .await
            .context("template copy panicked")??;
        tracing::info!(files = copied, output = %root.display(), "copied template tree");

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Write a file relative to the workspace root.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<PathBuf> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("Failed to write {path}"))?;
        Ok(full)
    }

    /// Write `.env` with the keys the generated project expects.
    pub async fn write_env(&self, env: &EnvFile) -> Result<PathBuf> {
        self.write_file(".env", &env.render()).await
    }
}

/// Values written to the generated project's `.env`.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    pub web3forms_key: String,
    pub runware_key: String,
    pub runware_api_url: String,
    pub domain: String,
    pub contact_email: String,
}

impl EnvFile {
    pub fn render(&self) -> String {
        let lines = [
            format!("PUBLIC_WEB3FORMS_ACCESS_KEY={}", self.web3forms_key),
            format!("RUNWARE_API_KEY={}", self.runware_key),
            format!("RUNWARE_API_URL={}", self.runware_api_url),
            format!("PUBLIC_SITE_URL=https://{}", self.domain),
            format!("CONTACT_EMAIL={}", self.contact_email),
            String::new(),
        ];
        lines.join("\n")
    }
}

async fn remove_path(path: &Path) -> Result<()> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    let removed = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    removed.with_context(|| format!("Failed to remove {}", path.display()))
}

/// Recursively copy `from` into `to`, returning the number of files copied.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in std::fs::read_dir(from).with_context(|| format!("Failed to list {}", from.display()))? {
        let entry = entry?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            std::fs::create_dir_all(&target)?;
            copied += copy_tree(&source, &target)?;
        } else {
            std::fs::copy(&source, &target)
                .with_context(|| format!("Failed to copy {}", source.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
