//! Flattening of raw aggregate-query results into table rows.
//!
//! The service returns the whole top-level object for a nested SELECT such as
//! `configuration.instanceType`, and names the requested paths separately in
//! the page metadata. Flattening resolves each dotted path into a flat column
//! named after the full path, lifts resource tags into their own columns and
//! then drops the nested containers the paths came from.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use crate::page::SelectField;

/// Member holding the resource's `{key, value}` tag list.
pub const TAGS_KEY: &str = "tags";

/// Member rewritten so spreadsheets keep it as text.
pub const ACCOUNT_ID_KEY: &str = "accountId";

/// One output row: column name to JSON value, in insertion order.
pub type FlatRow = IndexMap<String, Value>;

/// Reasons a raw result cannot be flattened.
#[derive(Debug, thiserror::Error)]
pub enum FlattenError {
    #[error("result is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("result is not a JSON object")]
    NotAnObject,

    #[error("field `{field}` cannot be resolved: `{segment}` is missing")]
    MissingSegment { field: String, segment: String },

    #[error("field `{field}` cannot be resolved: `{segment}` is not reached through an object")]
    NotTraversable { field: String, segment: String },

    #[error("malformed tags: {0}")]
    MalformedTags(String),
}

/// Per-run flattening settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Tag keys to lift; empty lifts every tag.
    pub tag_allow_list: Vec<String>,
}

impl FlattenOptions {
    /// Build options from a comma-separated allow-list. Blank entries are ignored.
    pub fn from_tag_list(list: Option<&str>) -> Self {
        let tag_allow_list = list
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        Self { tag_allow_list }
    }

    /// Returns `true` if a tag with this key should become a column.
    pub fn allows(&self, key: &str) -> bool {
        self.tag_allow_list.is_empty() || self.tag_allow_list.iter().any(|k| k == key)
    }
}

/// A flattened row plus the tag keys that collided with existing columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    pub row: FlatRow,
    pub collisions: Vec<String>,
}

/// Flatten one raw result against the page's select fields.
///
/// Fails on the first dotted path that cannot be resolved; rows are never
/// dropped silently. Tag collisions are logged and reported, and the tag
/// value overwrites the existing column.
pub fn flatten_result(
    raw: &str,
    select_fields: &[SelectField],
    options: &FlattenOptions,
) -> Result<Flattened, FlattenError> {
    let Value::Object(object) = serde_json::from_str::<Value>(raw)? else {
        return Err(FlattenError::NotAnObject);
    };
    let mut row: FlatRow = object.into_iter().collect();

    let dotted: Vec<&SelectField> = select_fields.iter().filter(|f| f.is_dotted()).collect();

    for field in &dotted {
        let value = resolve_path(&row, &field.name)?.clone();
        row.insert(field.name.clone(), value);
    }

    let mut collisions = Vec::new();
    if let Some(tags) = row.shift_remove(TAGS_KEY) {
        let mut lifted: HashSet<String> = HashSet::new();
        for (key, value) in parse_tags(tags)? {
            // Later tags with the same key replace earlier ones quietly.
            if row.contains_key(&key) && !lifted.contains(&key) {
                warn!(
                    tag = %key,
                    "A resource has a tag key that is the same name as one of the columns requested"
                );
                collisions.push(key.clone());
            }
            if !options.allows(&key) {
                continue;
            }
            lifted.insert(key.clone());
            row.insert(key, value);
        }
    }

    if let Some(account) = row.get_mut(ACCOUNT_ID_KEY) {
        *account = Value::String(formula_escape(account));
    }

    let selected: HashSet<&str> = select_fields.iter().map(|f| f.name.as_str()).collect();
    let mut removed: HashSet<&str> = HashSet::new();
    for field in &dotted {
        let top = field.top_level();
        if selected.contains(top) || !removed.insert(top) {
            continue;
        }
        row.shift_remove(top);
    }

    Ok(Flattened { row, collisions })
}

/// Walk `field`'s dot-separated segments through nested objects.
///
/// Arrays are never indexed; reaching one before the last segment fails.
fn resolve_path<'a>(row: &'a FlatRow, field: &str) -> Result<&'a Value, FlattenError> {
    let mut segments = field.split('.');
    let first = segments.next().unwrap_or(field);

    let mut current = row.get(first).ok_or_else(|| FlattenError::MissingSegment {
        field: field.to_string(),
        segment: first.to_string(),
    })?;

    for segment in segments {
        let Value::Object(map) = current else {
            return Err(FlattenError::NotTraversable {
                field: field.to_string(),
                segment: segment.to_string(),
            });
        };
        current = map.get(segment).ok_or_else(|| FlattenError::MissingSegment {
            field: field.to_string(),
            segment: segment.to_string(),
        })?;
    }

    Ok(current)
}

/// Decode a `tags` member into `(key, value)` pairs, in order.
///
/// A null member means no tags. A missing `value` becomes null.
fn parse_tags(tags: Value) -> Result<Vec<(String, Value)>, FlattenError> {
    let entries = match tags {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        other => {
            return Err(FlattenError::MalformedTags(format!(
                "expected an array, found {other}"
            )))
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            let Value::Object(mut tag) = entry else {
                return Err(FlattenError::MalformedTags(format!(
                    "expected a {{key, value}} object, found {entry}"
                )));
            };
            let key = match tag.remove("key") {
                Some(Value::String(key)) => key,
                _ => {
                    return Err(FlattenError::MalformedTags(
                        "tag without a string `key`".to_string(),
                    ))
                }
            };
            let value = tag.remove("value").unwrap_or(Value::Null);
            Ok((key, value))
        })
        .collect()
}

/// Wrap a value as `="<value>"` so spreadsheet tools read it as text.
pub fn formula_escape(value: &Value) -> String {
    match value {
        Value::String(s) => format!("=\"{s}\""),
        Value::Null => "=\"\"".to_string(),
        other => format!("=\"{other}\""),
    }
}
