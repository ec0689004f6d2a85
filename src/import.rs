//! Import and export of location collections as JSON

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{PlannerError, Result};
use crate::models::Location;
use crate::propagate::recompute;

pub const EXPORT_VERSION: &str = "1.0";

/// Wrapped export format. Older exports are a bare array of locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: String,
    pub locations: Vec<Location>,
}

/// Parse and validate an import document into a propagated collection.
///
/// Nothing is returned unless every location validates.
pub fn parse_locations(json: &str) -> Result<Vec<Location>> {
    let document: Value = serde_json::from_str(json)?;

    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("locations") {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(PlannerError::InvalidDocument(
                    "\"locations\" must be an array".to_string(),
                ));
            }
            None => {
                return Err(PlannerError::InvalidDocument(
                    "missing \"locations\" array".to_string(),
                ));
            }
        },
        _ => {
            return Err(PlannerError::InvalidDocument(
                "expected an array of locations or an export document".to_string(),
            ));
        }
    };

    let mut locations = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        locations.push(parse_location(index, entry)?);
    }

    info!(count = locations.len(), "parsed locations");
    Ok(recompute(locations))
}

fn parse_location(index: usize, entry: Value) -> Result<Location> {
    let invalid = |reason: String| PlannerError::InvalidLocation { index, reason };

    let Value::Object(fields) = &entry else {
        return Err(invalid("not an object".to_string()));
    };

    match fields.get("id") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(invalid("\"id\" must be a string".to_string())),
        None => return Err(invalid("missing \"id\"".to_string())),
    }

    match fields.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        Some(Value::String(_)) => return Err(invalid("\"name\" is empty".to_string())),
        Some(_) => return Err(invalid("\"name\" must be a string".to_string())),
        None => return Err(invalid("missing \"name\"".to_string())),
    }

    serde_json::from_value(entry).map_err(|e| invalid(e.to_string()))
}

/// Wrap a collection for export, stamped with the current time
pub fn export_document(locations: &[Location]) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        export_date: format_timestamp(Utc::now()),
        locations: locations.to_vec(),
    }
}

pub fn export_json(locations: &[Location]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export_document(locations))?)
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-03-01T12:00:00.000Z`
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
