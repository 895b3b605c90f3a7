//! Profile loading.
//!
//! A store is loaded once and then read-only. Every input profile occupies a
//! slot, in input order: either the validated profile or the reason it was
//! rejected. One bad profile never prevents the others from loading.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use super::definition::{EvaluatorProfile, ProfileDefinition};
use super::error::{ProfileError, ProfileResult};

const BUILTIN: [(&str, &str); 4] = [
    (
        "builtin:struggling_reader",
        include_str!("../../profiles/struggling_reader.toml"),
    ),
    (
        "builtin:english_learner",
        include_str!("../../profiles/english_learner.toml"),
    ),
    (
        "builtin:advanced_learner",
        include_str!("../../profiles/advanced_learner.toml"),
    ),
    (
        "builtin:attention_focused",
        include_str!("../../profiles/attention_focused.toml"),
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    Toml,
    Json,
}

impl ProfileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Why a profile was not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileFailure {
    /// File path or `builtin:<name>`.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileSlot {
    Loaded(EvaluatorProfile),
    Failed(ProfileFailure),
}

#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    slots: Vec<ProfileSlot>,
}

/// Parse one profile definition without validating it.
pub fn parse_definition(
    source_name: &str,
    text: &str,
    format: ProfileFormat,
) -> ProfileResult<ProfileDefinition> {
    let parsed = match format {
        ProfileFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        ProfileFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| ProfileError::Parse {
        source_name: source_name.to_string(),
        detail,
    })
}

/// Parse and validate one profile.
pub fn load_profile_str(
    source_name: &str,
    text: &str,
    format: ProfileFormat,
) -> ProfileResult<EvaluatorProfile> {
    EvaluatorProfile::try_from(parse_definition(source_name, text, format)?)
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled personas.
    pub fn builtin() -> Self {
        let mut store = Self::new();
        for (source, text) in BUILTIN {
            store.insert_str(source, text, ProfileFormat::Toml);
        }
        store
    }

    /// Load every `*.toml` / `*.json` file in `dir`, sorted by file name.
    ///
    /// Fails only when the directory itself cannot be read; per-file
    /// problems become failed slots.
    pub fn load_dir(dir: &Path) -> ProfileResult<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if ProfileFormat::from_path(&path).is_some() {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-profile file");
            }
        }
        paths.sort();

        let mut store = Self::new();
        for path in paths {
            store.insert_file(&path);
        }
        Ok(store)
    }

    /// Load one file into a new slot.
    pub fn insert_file(&mut self, path: &Path) {
        let source = path.display().to_string();
        let Some(format) = ProfileFormat::from_path(path) else {
            self.push_failure(
                &source,
                None,
                ProfileError::UnsupportedFormat(source.clone()),
            );
            return;
        };
        match std::fs::read_to_string(path) {
            Ok(text) => self.insert_str(&source, &text, format),
            Err(e) => self.push_failure(&source, None, ProfileError::Io(e)),
        }
    }

    /// Parse, validate and record one profile text.
    pub fn insert_str(&mut self, source: &str, text: &str, format: ProfileFormat) {
        match parse_definition(source, text, format) {
            Ok(def) => self.insert_definition(source, def),
            Err(e) => self.push_failure(source, None, e),
        }
    }

    pub fn insert_definition(&mut self, source: &str, def: ProfileDefinition) {
        let declared_id = def.id.trim().to_string();
        let declared = (!declared_id.is_empty()).then_some(declared_id);

        let profile = match EvaluatorProfile::try_from(def) {
            Ok(p) => p,
            Err(e) => return self.push_failure(source, declared, e),
        };
        if self.get(&profile.id).is_some() {
            let id = profile.id.clone();
            return self.push_failure(source, Some(id.clone()), ProfileError::DuplicateProfile(id));
        }

        debug!(
            profile = %profile.id,
            source,
            criteria = profile.evaluation_criteria.len(),
            "profile loaded"
        );
        self.slots.push(ProfileSlot::Loaded(profile));
    }

    fn push_failure(&mut self, source: &str, profile_id: Option<String>, error: ProfileError) {
        warn!(source, profile = ?profile_id, error = %error, "profile rejected");
        self.slots.push(ProfileSlot::Failed(ProfileFailure {
            source: source.to_string(),
            profile_id,
            reason: error.to_string(),
        }));
    }

    pub fn slots(&self) -> &[ProfileSlot] {
        &self.slots
    }

    pub fn profiles(&self) -> impl Iterator<Item = &EvaluatorProfile> {
        self.slots.iter().filter_map(|s| match s {
            ProfileSlot::Loaded(p) => Some(p),
            ProfileSlot::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProfileFailure> {
        self.slots.iter().filter_map(|s| match s {
            ProfileSlot::Failed(f) => Some(f),
            ProfileSlot::Loaded(_) => None,
        })
    }

    pub fn get(&self, id: &str) -> Option<&EvaluatorProfile> {
        self.profiles().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
