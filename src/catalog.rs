//! Static resource catalog
//!
//! Loaded from the JSON resource dumps shipped alongside the planner. The catalog
//! only supplies human-readable names; propagation compares class names directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{PlannerError, Result};
use crate::models::Resource;

static CLASS_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid class name pattern"));

/// True if `class_name` is a lowercase-dashed identifier
pub fn is_valid_class_name(class_name: &str) -> bool {
    CLASS_NAME_RE.is_match(class_name)
}

#[derive(Debug, Default, Clone)]
pub struct Catalog {
    resources: BTreeMap<String, Resource>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.merge_json(json)?;
        Ok(catalog)
    }

    /// Load a single JSON file, or every `*.json` file below a directory
    pub fn load(path: &Path) -> Result<Self> {
        let catalog = if path.is_dir() {
            let mut files: Vec<_> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            files.sort();

            let mut catalog = Self::new();
            for file in files {
                let json = fs::read_to_string(&file)?;
                catalog
                    .merge_json(&json)
                    .map_err(|e| PlannerError::Catalog(format!("{}: {}", file.display(), e)))?;
            }
            catalog
        } else {
            Self::from_json(&fs::read_to_string(path)?)?
        };

        info!(path = %path.display(), resources = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    fn merge_json(&mut self, json: &str) -> Result<()> {
        let entries: Vec<Resource> = serde_json::from_str(json)
            .map_err(|e| PlannerError::Catalog(format!("expected an array of resources: {}", e)))?;
        for resource in entries {
            self.insert(resource);
        }
        Ok(())
    }

    /// Add or replace an entry. Malformed class names are kept but reported.
    pub fn insert(&mut self, resource: Resource) {
        if !is_valid_class_name(&resource.class_name) {
            warn!(class_name = %resource.class_name, "class name is not lowercase-dashed");
        }
        self.resources.insert(resource.class_name.clone(), resource);
    }

    pub fn get(&self, class_name: &str) -> Option<&Resource> {
        self.resources.get(class_name)
    }

    /// Display name for a class name, falling back to the class name itself
    pub fn display_name<'a>(&'a self, class_name: &'a str) -> &'a str {
        match self.get(class_name) {
            Some(r) if !r.display_name.is_empty() => &r.display_name,
            _ => class_name,
        }
    }

    /// Full catalog entry for a class name, or a bare resource when unknown
    pub fn resolve(&self, class_name: &str) -> Resource {
        self.get(class_name)
            .cloned()
            .unwrap_or_else(|| Resource::bare(class_name))
    }

    /// Case-insensitive substring match on display name or class name
    pub fn search(&self, term: &str) -> Vec<&Resource> {
        let term = term.to_lowercase();
        self.resources
            .values()
            .filter(|r| {
                r.class_name.to_lowercase().contains(&term)
                    || r.display_name.to_lowercase().contains(&term)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}
