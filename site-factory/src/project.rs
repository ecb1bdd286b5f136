//! Project identity: company, slug, domain and contact defaults.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Slugs never exceed this many characters.
const MAX_SLUG_LEN: usize = 60;

static FOR_COMPANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"for\s+([A-Z][a-zA-Z0-9&\s]{2,})").expect("valid regex"));

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Identity fields as supplied on the command line. Anything left `None`
/// is derived by [`ProjectIdentity::resolve`].
#[derive(Debug, Clone, Default)]
pub struct IdentityInput {
    pub description: String,
    pub company: Option<String>,
    pub slug: Option<String>,
    pub domain: Option<String>,
    pub output: Option<PathBuf>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sms_description: Option<String>,
}

/// Fully resolved identity of the project being generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    pub description: String,
    pub company: String,
    pub slug: String,
    pub domain: String,
    /// Absolute path of the generated project.
    pub output: PathBuf,
    pub email: String,
    pub phone: String,
    pub sms_description: String,
}

impl ProjectIdentity {
    /// Apply the defaulting rules. Relative output paths are resolved
    /// against `cwd`.
    pub fn resolve(input: IdentityInput, cwd: &Path) -> Self {
        let company = infer_company(&input.description, input.company.as_deref());
        let slug = non_empty(input.slug).unwrap_or_else(|| slugify(&company));
        let domain = non_empty(input.domain).unwrap_or_else(|| format!("{slug}.com"));
        let output = input.output.unwrap_or_else(|| PathBuf::from(&slug));
        let output = if output.is_absolute() {
            output
        } else {
            cwd.join(output)
        };
        let email = non_empty(input.email).unwrap_or_else(|| format!("hello@{domain}"));

        Self {
            description: input.description,
            company,
            slug,
            domain,
            output,
            email,
            phone: input.phone.unwrap_or_default(),
            sms_description: non_empty(input.sms_description)
                .unwrap_or_else(|| "business services".to_string()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Lowercase, collapse non-alphanumeric runs to `-`, trim dashes, cap at 60.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let dashed = NON_SLUG.replace_all(&lowered, "-");
    dashed
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_LEN)
        .collect()
}

/// Pick the company name: the explicit one, a capitalised phrase after
/// "for", the first three words of the first clause, or a placeholder.
pub fn infer_company(description: &str, explicit: Option<&str>) -> String {
    if let Some(company) = explicit.filter(|c| !c.trim().is_empty()) {
        return company.to_string();
    }
    if let Some(found) = FOR_COMPANY.captures(description).and_then(|c| c.get(1)) {
        let trimmed = found.as_str().trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let first_clause = description
        .lines()
        .next()
        .unwrap_or_default()
        .split([',', '.', ':'])
        .next()
        .unwrap_or_default();
    let first_words = first_clause
        .split(' ')
        .filter(|w| !w.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(" ");
    if first_words.is_empty() {
        "Your Company".to_string()
    } else {
        first_words
    }
}
