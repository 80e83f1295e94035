use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::common::constants::DEFAULT_WEEK_RANGE;
use crate::error::SchemaError;

/// A declared field and its type hint.
///
/// The hint is informational; enforcement happens through the quality gate rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub type_hint: Option<String>,
}

/// Inclusive bounds for the `week` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekRange {
    pub lo: i64,
    pub hi: i64,
}

impl WeekRange {
    pub fn new(lo: i64, hi: i64) -> Result<Self, SchemaError> {
        if lo > hi {
            return Err(SchemaError::InvertedWeekRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    pub fn contains(&self, week: i64) -> bool {
        week >= self.lo && week <= self.hi
    }
}

impl Default for WeekRange {
    fn default() -> Self {
        Self {
            lo: DEFAULT_WEEK_RANGE.0,
            hi: DEFAULT_WEEK_RANGE.1,
        }
    }
}

/// The validated rule configuration for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    required: Vec<FieldSpec>,
    optional: Vec<FieldSpec>,
    primary_key: Vec<String>,
    week_range: WeekRange,
}

impl Schema {
    pub fn new(
        required: Vec<FieldSpec>,
        optional: Vec<FieldSpec>,
        primary_key: Vec<String>,
        week_range: WeekRange,
    ) -> Result<Self, SchemaError> {
        let required_names: HashSet<&str> = required.iter().map(|f| f.name.as_str()).collect();
        if let Some(both) = optional
            .iter()
            .find(|f| required_names.contains(f.name.as_str()))
        {
            return Err(SchemaError::ConflictingField(both.name.clone()));
        }

        let declared: HashSet<&str> = required
            .iter()
            .chain(optional.iter())
            .map(|f| f.name.as_str())
            .collect();

        let mut seen = HashSet::new();
        let mut unknown = Vec::new();
        for key in &primary_key {
            if !seen.insert(key.as_str()) {
                return Err(SchemaError::RepeatedKeyField(key.clone()));
            }
            if !declared.contains(key.as_str()) {
                unknown.push(key.clone());
            }
        }
        if !unknown.is_empty() {
            return Err(SchemaError::UnknownKeyField(unknown));
        }

        Ok(Self {
            required,
            optional,
            primary_key,
            week_range,
        })
    }

    pub fn required(&self) -> &[FieldSpec] {
        &self.required
    }

    pub fn optional(&self) -> &[FieldSpec] {
        &self.optional
    }

    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(|f| f.name.as_str())
    }

    pub fn optional_names(&self) -> impl Iterator<Item = &str> {
        self.optional.iter().map(|f| f.name.as_str())
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn week_range(&self) -> WeekRange {
        self.week_range
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required_names().any(|n| n == name)
    }
}

/// On-disk shape of the schema description.
#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    required: Map<String, Value>,
    #[serde(default)]
    optional: Map<String, Value>,
    #[serde(default)]
    primary_key: Vec<String>,
    #[serde(default)]
    week_range: Option<[i64; 2]>,
}

fn field_specs(fields: Map<String, Value>) -> Vec<FieldSpec> {
    fields
        .into_iter()
        .map(|(name, hint)| {
            let type_hint = match hint {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
            FieldSpec { name, type_hint }
        })
        .collect()
}

/// Parses schema descriptions into a [`Schema`].
pub struct SchemaLoader;

impl SchemaLoader {
    /// Load a schema description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Schema, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        let schema = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            required = schema.required.len(),
            optional = schema.optional.len(),
            primary_key = ?schema.primary_key,
            "Loaded schema"
        );
        Ok(schema)
    }

    /// Parse a schema description from JSON text.
    pub fn parse(content: &str) -> Result<Schema, SchemaError> {
        let doc: SchemaDocument = serde_json::from_str(content)?;
        let week_range = match doc.week_range {
            Some([lo, hi]) => WeekRange::new(lo, hi)?,
            None => WeekRange::default(),
        };
        Schema::new(
            field_specs(doc.required),
            field_specs(doc.optional),
            doc.primary_key,
            week_range,
        )
    }
}
