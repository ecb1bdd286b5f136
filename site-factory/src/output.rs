//! Operator-facing output.
//!
//! Logs go to stderr through tracing; this module formats the short
//! human summary printed to stdout at the end of a run.

use std::fmt::Write as _;
use std::path::Path;

use crate::skills::{SkillResult, SkillStatus};

fn status_emoji(status: SkillStatus) -> &'static str {
    match status {
        SkillStatus::Completed => "✅",
        SkillStatus::Skipped => "⏭️",
        SkillStatus::Failed => "❌",
        SkillStatus::PendingManual => "📝",
    }
}

/// One line per skill: `<emoji> <id>: <status> (<note>)`.
pub fn skill_lines(skills: &[SkillResult]) -> Vec<String> {
    skills
        .iter()
        .map(|skill| {
            let mut line = format!("{} {}: {}", status_emoji(skill.status), skill.id, skill.status);
            if let Some(note) = &skill.note {
                let _ = write!(line, " ({note})");
            }
            line
        })
        .collect()
}

/// The full end-of-run summary.
pub fn summary(output: &Path, skills: &[SkillResult]) -> String {
    let out = output.display();
    let mut lines = vec![
        "Factory complete.".to_string(),
        format!("Project scaffold created at: {out}"),
        "Skills:".to_string(),
    ];
    lines.extend(skill_lines(skills).into_iter().map(|l| format!("  {l}")));
    lines.extend([
        "Next steps:".to_string(),
        format!("  1) cd {out}"),
        "  2) bun install".to_string(),
        "  3) Add / edit PUBLIC_WEB3FORMS_ACCESS_KEY in .env.local".to_string(),
        "  4) Connect this repo to Vercel for auto deploy from GitHub".to_string(),
        "  5) Add custom domain DNS + run Cloudflare skill if enabled.".to_string(),
    ]);
    lines.join("\n")
}
