#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use site_factory::skills::{CommandOutput, CommandRunner, SkillCommand};

/// Bytes that are not valid UTF-8, to prove literal files are never decoded.
pub const BINARY: &[u8] = &[0x89, b'P', b'N', b'G', 0xff, 0x00, 0xfe, b'{', b'{'];

/// The template tree shipped with the crate.
pub fn bundled_template() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("factory-template")
}

/// A small template tree with nested dirs, repeated and unknown tokens,
/// and literal files that contain token-like text.
pub fn template_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src/pages/legal")).unwrap();
    std::fs::create_dir_all(root.join("public")).unwrap();
    std::fs::write(
        root.join("README.md.template"),
        "# {{COMPANY_NAME}}\n{{COMPANY_NAME}} at {{DOMAIN}}{{NOT_MAPPED}}\n",
    )
    .unwrap();
    std::fs::write(
        root.join("src/pages/legal/privacy.md.template"),
        "Contact {{CONTACT_EMAIL}}",
    )
    .unwrap();
    std::fs::write(root.join("src/pages/index.astro"), "literal {{COMPANY_NAME}}").unwrap();
    std::fs::write(root.join("public/logo.png"), BINARY).unwrap();
    dir
}

/// Every file under `root`, relative path to bytes.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().to_string();
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

/// Copy a directory tree (test-side, independent of the crate's copy).
pub fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// Command runner that records invocations instead of spawning processes.
/// Commands whose program is listed in `failing` return an error.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<(SkillCommand, PathBuf)>>,
    pub failing: Vec<String>,
}

impl RecordingRunner {
    pub fn failing(programs: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: programs.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<(SkillCommand, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &SkillCommand, cwd: &Path) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((command.clone(), cwd.to_path_buf()));
        if self.failing.contains(&command.program) {
            anyhow::bail!("Command failed: {} (code: 1)", command.display());
        }
        Ok(CommandOutput::default())
    }
}
