//! The run manifest: one JSON record per factory run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::skills::SkillResult;

/// Location of the manifest inside the generated project.
pub const MANIFEST_PATH: &str = ".factory/blueprint.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(serialize_with = "millis_rfc3339")]
    pub created_at: DateTime<Utc>,
    pub source_description: String,
    pub domain: String,
    pub company: String,
    pub slug: String,
    pub output: PathBuf,
    pub generated_from: String,
    pub skills: Vec<SkillResult>,
}

fn millis_rfc3339<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Manifest {
    /// Write the manifest under `project_root`, creating `.factory/`.
    pub async fn write(&self, project_root: &Path) -> Result<PathBuf> {
        let path = project_root.join(MANIFEST_PATH);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write manifest {}", path.display()))?;
        Ok(path)
    }
}
