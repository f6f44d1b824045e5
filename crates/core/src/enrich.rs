//! Enrichment collaborator: web page fetches and profile lookups.
//!
//! A capability is an ordered list of [`FetchStrategy`] implementations; the
//! pipeline crate composes them into a fallback chain that returns the first
//! successful result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Which enrichment capability a target uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentKind {
    WebPage,
    Profile,
}

/// A single thing to enrich the material with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentTarget {
    pub kind: EnrichmentKind,
    /// URL or profile identifier.
    pub identifier: String,
    /// Free-form label for web pages ("website", "product", "press", ...).
    #[serde(default = "default_label")]
    pub label: String,
}

const WEB_FAILURE_PREFIX: &str = "[Failed to fetch ";
const PROFILE_FAILURE_PREFIX: &str = "Error fetching founder background: ";

/// Whether `text` is an inline marker left by a failed enrichment.
pub fn is_failure_marker(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with(WEB_FAILURE_PREFIX) || text.starts_with(PROFILE_FAILURE_PREFIX)
}

fn default_label() -> String {
    "other".into()
}

impl EnrichmentTarget {
    pub fn web_page(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: EnrichmentKind::WebPage,
            identifier: url.into(),
            label: label.into(),
        }
    }

    pub fn profile(identifier: impl Into<String>) -> Self {
        Self {
            kind: EnrichmentKind::Profile,
            identifier: identifier.into(),
            label: "profile".into(),
        }
    }

    /// Inline marker substituted for this target when its fetch fails.
    pub fn failure_marker(&self, error: &str) -> String {
        match self.kind {
            EnrichmentKind::WebPage => format!("{WEB_FAILURE_PREFIX}{}: {error}]", self.identifier),
            EnrichmentKind::Profile => format!("{PROFILE_FAILURE_PREFIX}{error}"),
        }
    }
}

/// One position held by a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// One degree held by a person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree_name: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
}

/// Structured profile data returned by a profile lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

impl ProfileData {
    /// Render as the line-oriented block the classifier and summarizer read.
    pub fn render(&self, identifier: &str) -> String {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "Not available".into());
        let list_or_na = |items: Vec<String>| {
            if items.is_empty() {
                "Not available".to_string()
            } else {
                items.join(", ")
            }
        };

        let experience = list_or_na(
            self.experiences
                .iter()
                .map(|e| {
                    format!(
                        "{} at {}",
                        e.title.as_deref().unwrap_or("Unknown role"),
                        e.company.as_deref().unwrap_or("unknown company")
                    )
                })
                .collect(),
        );
        let education = list_or_na(
            self.education
                .iter()
                .map(|e| {
                    format!(
                        "{} from {}",
                        e.degree_name.as_deref().unwrap_or("Degree"),
                        e.school.as_deref().unwrap_or("unknown school")
                    )
                })
                .collect(),
        );

        format!(
            "Name: {}\nCurrent Position: {}\nSummary: {}\nExperience: {}\nEducation: {}\nSkills: {}\nProfile URL: {}",
            or_na(&self.full_name),
            or_na(&self.occupation),
            or_na(&self.summary),
            experience,
            education,
            list_or_na(self.skills.clone()),
            self.profile_url.as_deref().unwrap_or(identifier),
        )
    }
}

/// What an enrichment fetch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Enrichment {
    Text { text: String },
    Profile { profile: ProfileData },
}

impl Enrichment {
    /// Text contribution for the fragment pool.
    pub fn render(&self, target: &EnrichmentTarget) -> String {
        match self {
            Enrichment::Text { text } => format!(
                "Content from {} URL ({}):\n{}",
                target.label, target.identifier, text
            ),
            Enrichment::Profile { profile } => format!(
                "Founder Information from profile lookup:\n{}",
                profile.render(&target.identifier)
            ),
        }
    }
}

/// One way of fetching an enrichment for an identifier.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Strategy name for logs (e.g. "profile_api", "public_page").
    fn name(&self) -> &str;

    async fn fetch(&self, identifier: &str) -> std::result::Result<Enrichment, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_markers_match_kind() {
        let web = EnrichmentTarget::web_page("https://acme.io", "website");
        assert_eq!(
            web.failure_marker("timeout"),
            "[Failed to fetch https://acme.io: timeout]"
        );
        let profile = EnrichmentTarget::profile("jdoe");
        assert!(profile.failure_marker("404").starts_with("Error fetching founder background"));
        assert!(is_failure_marker(&web.failure_marker("timeout")));
        assert!(is_failure_marker(&profile.failure_marker("404")));
        assert!(!is_failure_marker("Fetched https://acme.io fine"));
    }

    #[test]
    fn profile_renders_missing_fields_as_not_available() {
        let profile = ProfileData {
            full_name: Some("Jane Doe".into()),
            experiences: vec![Experience {
                title: Some("CTO".into()),
                company: Some("Acme".into()),
            }],
            ..Default::default()
        };
        let text = profile.render("https://www.linkedin.com/in/jdoe");
        assert!(text.contains("Name: Jane Doe"));
        assert!(text.contains("Current Position: Not available"));
        assert!(text.contains("Experience: CTO at Acme"));
        assert!(text.contains("Skills: Not available"));
        assert!(text.ends_with("Profile URL: https://www.linkedin.com/in/jdoe"));
    }

    #[test]
    fn web_enrichment_renders_with_url_header() {
        let target = EnrichmentTarget::web_page("https://acme.io", "website");
        let rendered = Enrichment::Text {
            text: "We build rockets.".into(),
        }
        .render(&target);
        assert_eq!(rendered, "Content from website URL (https://acme.io):\nWe build rockets.");
    }
}
