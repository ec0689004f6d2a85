//! Data models for locations and the resources they move

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A catalog resource. Two resources are the same iff their `class_name` matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub class_name: String, // e.g. "desc-silica-c"
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl Resource {
    pub fn new(class_name: &str, display_name: &str, description: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
        }
    }

    /// Resource known only by its class name
    pub fn bare(class_name: &str) -> Self {
        Self::new(class_name, "", "")
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_name.hash(state);
    }
}

/// A declared demand, in units/minute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub resource: Resource,
    pub amount: f64,
}

/// A declared supply, in units/minute.
///
/// `consumption` is derived: it is overwritten by every propagation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub resource: Resource,
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consumption: f64,
}

impl ProductionRecord {
    pub fn surplus(&self) -> f64 {
        self.amount - self.consumption
    }
}

/// A production site in the supply graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub y: f64,
    /// Ids of locations this one draws from. May dangle or repeat.
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_sources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub consumption: Vec<ConsumptionRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub production: Vec<ProductionRecord>,
}

impl Location {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            x: 0.0,
            y: 0.0,
            resource_sources: Vec::new(),
            consumption: Vec::new(),
            production: Vec::new(),
        }
    }

    pub fn with_source(mut self, source_id: &str) -> Self {
        self.resource_sources.push(source_id.to_string());
        self
    }

    pub fn consumes(mut self, resource: Resource, amount: f64) -> Self {
        self.consumption.push(ConsumptionRecord { resource, amount });
        self
    }

    pub fn produces(mut self, resource: Resource, amount: f64) -> Self {
        self.production.push(ProductionRecord {
            resource,
            amount,
            consumption: 0.0,
        });
        self
    }

    pub fn production_of(&self, class_name: &str) -> Option<&ProductionRecord> {
        self.production
            .iter()
            .find(|p| p.resource.class_name == class_name)
    }
}
