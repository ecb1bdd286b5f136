//! Marketing copy derived from the project description.
//!
//! Pure keyword heuristics. Every call produces a complete bundle, falling
//! back to boilerplate when the description says nothing useful.

use serde::{Deserialize, Serialize};

/// Longest sentence kept verbatim by [`safe_sentence`].
const MAX_SENTENCE_CHARS: usize = 140;

/// One entry of the services grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub title: String,
    pub body: String,
}

/// Everything the templates need in terms of prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyBundle {
    pub headline: String,
    pub subtitle: String,
    pub uvp_headline: String,
    pub uvp_body: String,
    pub services: Vec<Service>,
    pub process: Vec<String>,
    pub icp: Vec<String>,
}

/// Collapse whitespace, trim, and cap the result at 140 characters.
///
/// Overlong text keeps its first 137 characters followed by `...`.
/// Blank input falls back to `fallback`.
pub fn safe_sentence(text: &str, fallback: &str) -> String {
    let source = if text.is_empty() { fallback } else { text };
    let output = source.split_whitespace().collect::<Vec<_>>().join(" ");
    if output.chars().count() > MAX_SENTENCE_CHARS {
        let head: String = output.chars().take(MAX_SENTENCE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        output
    }
}

/// Build the copy bundle for `company` from the free-text `description`.
pub fn generate(description: &str, company: &str) -> CopyBundle {
    let desc = description.to_lowercase();
    let core = if description.trim().is_empty() {
        format!("{company} delivers strategy and technical execution for modern businesses.")
    } else {
        description.to_string()
    };
    let first = core
        .split('.')
        .find(|segment| !segment.is_empty())
        .unwrap_or(&core);
    let headline = safe_sentence(
        first,
        &format!("{company} builds practical AI systems for real teams."),
    );

    let mut services = vec![
        Service {
            title: "AI strategy and operations planning".to_string(),
            body: format!(
                "{company} maps tools, teams, and data to define a practical AI-first roadmap with measurable outcomes."
            ),
        },
        Service {
            title: "Workflow automation delivery".to_string(),
            body: "We design automations for intake, CRM, billing, reporting, and customer touchpoints to remove repetitive work.".to_string(),
        },
        Service {
            title: "Custom solution engineering".to_string(),
            body: "We build and integrate secure web apps, dashboards, and API workflows that match your exact operating model.".to_string(),
        },
        Service {
            title: "Governance and enablement".to_string(),
            body: "We define ownership, handover, documentation, and support patterns to keep execution stable after launch.".to_string(),
        },
    ];

    if desc.contains("consult") {
        services[0].body = format!(
            "{company} combines technical capability with business fluency to design AI-first strategy your team can follow."
        );
    }
    if desc.contains("automate") {
        services[1].body = format!(
            "{company} builds automations with rollback-safe deployment patterns and monitoring from day one."
        );
    }
    if desc.contains("product") || desc.contains("software") {
        services[2].body = format!(
            "{company} engineers tailored software around your workflows, data sources, and integrations."
        );
    }

    let process = [
        "Discover: systems audit, team interviews, pain-point map.",
        "Design: architecture, automation roadmap, implementation priorities.",
        "Build: short sprints, live demos, secure integrations.",
        "Deploy: launch, training, observability, and continuous improvement.",
    ]
    .map(String::from)
    .to_vec();

    let icp = [
        "Small and medium businesses using multiple disconnected systems.",
        "Teams with repetitive manual operations and growing support pressure.",
        "Founders scaling operations from startup stage to stable growth.",
    ]
    .map(String::from)
    .to_vec();

    CopyBundle {
        headline,
        subtitle: "We align technology strategy, workflow automation, and custom software so your team can ship faster without adding operational drag.".to_string(),
        uvp_headline: format!(
            "{company} brings strategy, build, and launch into one practical workflow."
        ),
        uvp_body: "We avoid generic AI platform pitches and ship measurable systems. Every initiative is tied to an owner, a sequence, and a KPI.".to_string(),
        services,
        process,
        icp,
    }
}
