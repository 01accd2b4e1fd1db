//! Quest templates and the difficulty-bucketed template index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use guild_core::{Difficulty, QuestValue};

/// Domains compiled into the crate, keyed by domain name.
const BUNDLED_DOMAINS: &[(&str, &str)] = &[
    ("general", include_str!("../quests/general.json")),
    ("software", include_str!("../quests/software.json")),
    ("research", include_str!("../quests/research.json")),
];

/// Error types for template loading.
#[derive(Debug, thiserror::Error)]
pub enum TemplateLoadError {
    /// No bundled resource for the domain
    #[error("Unknown quest domain: {0}")]
    UnknownDomain(String),

    /// Template file could not be read
    #[error("Failed to read quest file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Resource failed structural decode
    #[error("Malformed quest templates in {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A reusable quest definition. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub input: QuestValue,
    /// Judging criteria, in rubric order
    #[serde(default)]
    pub criteria: Vec<String>,
}

impl QuestTemplate {
    pub fn requires(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }
}

/// On-disk layout of a template resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestTemplateFile {
    pub domain: String,
    #[serde(default)]
    pub description: String,
    pub quests: Vec<QuestTemplate>,
}

/// Where templates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Resource compiled into the crate
    Bundled { domain: String },
    /// JSON file read at runtime
    File { path: PathBuf },
}

impl TemplateSource {
    pub fn bundled(domain: impl Into<String>) -> Self {
        Self::Bundled {
            domain: domain.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// A configured file path overrides the domain name.
    pub fn from_config(domain: &str, file: Option<&Path>) -> Self {
        match file {
            Some(path) => Self::file(path),
            None => Self::bundled(domain),
        }
    }

    /// Names of every bundled domain.
    pub fn bundled_domains() -> Vec<&'static str> {
        BUNDLED_DOMAINS.iter().map(|(name, _)| *name).collect()
    }

    async fn read(&self) -> Result<(String, String), TemplateLoadError> {
        match self {
            Self::Bundled { domain } => BUNDLED_DOMAINS
                .iter()
                .find(|(name, _)| *name == domain.as_str())
                .map(|(name, raw)| (format!("bundled:{name}"), raw.to_string()))
                .ok_or_else(|| TemplateLoadError::UnknownDomain(domain.clone())),
            Self::File { path } => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|source| {
                    TemplateLoadError::Io {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok((path.display().to_string(), raw))
            }
        }
    }
}

/// Templates of one domain, bucketed by difficulty.
///
/// Buckets preserve load order and are built once; the index is read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct QuestTemplateIndex {
    domain: String,
    description: String,
    templates: Vec<QuestTemplate>,
    by_difficulty: HashMap<Difficulty, Vec<usize>>,
}

impl QuestTemplateIndex {
    /// Load and index templates from a source.
    pub async fn load(source: &TemplateSource) -> Result<Self, TemplateLoadError> {
        let (origin, raw) = source.read().await?;
        let file: QuestTemplateFile = serde_json::from_str(&raw)
            .map_err(|source| TemplateLoadError::Malformed { origin: origin.clone(), source })?;

        debug!(
            origin = %origin,
            domain = %file.domain,
            templates = file.quests.len(),
            "Loaded quest templates"
        );

        Ok(Self::from_templates(file.domain, file.quests).with_description(file.description))
    }

    /// Index an in-memory template list.
    pub fn from_templates(domain: impl Into<String>, templates: Vec<QuestTemplate>) -> Self {
        let mut by_difficulty: HashMap<Difficulty, Vec<usize>> = HashMap::new();
        for (position, template) in templates.iter().enumerate() {
            by_difficulty
                .entry(template.difficulty)
                .or_default()
                .push(position);
        }

        Self {
            domain: domain.into(),
            description: String::new(),
            templates,
            by_difficulty,
        }
    }

    fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Every template, in load order.
    pub fn all(&self) -> &[QuestTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&QuestTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Templates at exactly `difficulty`, in load order. Empty when none.
    pub fn at_difficulty(&self, difficulty: Difficulty) -> Vec<&QuestTemplate> {
        self.by_difficulty
            .get(&difficulty)
            .map(|positions| positions.iter().map(|&i| &self.templates[i]).collect())
            .unwrap_or_default()
    }

    /// Templates requiring `skill`, in load order.
    pub fn by_skill(&self, skill: &str) -> Vec<&QuestTemplate> {
        self.templates.iter().filter(|t| t.requires(skill)).collect()
    }
}
