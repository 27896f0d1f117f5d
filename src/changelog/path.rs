//! Dotted field paths over JSON documents, e.g. `startingActions.0.amount`.
//! Bracketed indices (`startingActions[0].amount`) are accepted as well.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ChangeLogError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, ChangeLogError> {
        let invalid = || ChangeLogError::InvalidPath(raw.to_string());
        let normalized = raw.trim().replace('[', ".").replace(']', "");

        if normalized.is_empty() {
            return Err(invalid());
        }

        let mut segments = Vec::new();
        for part in normalized.split('.') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid());
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                let index = part.parse::<usize>().map_err(|_| invalid())?;
                segments.push(Segment::Index(index));
            } else {
                segments.push(Segment::Key(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value at this path, if every segment exists.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Writes `new_value` at this path.
    ///
    /// Missing or null intermediate containers are created to match the next
    /// segment. An index equal to the array length appends; anything beyond is
    /// rejected.
    pub fn set(&self, root: &mut Value, new_value: Value) -> Result<(), ChangeLogError> {
        let mut current = root;

        for (position, segment) in self.segments.iter().enumerate() {
            let is_last = position + 1 == self.segments.len();

            current = match segment {
                Segment::Key(key) => {
                    if current.is_null() {
                        *current = Value::Object(Map::new());
                    }
                    let map = match current {
                        Value::Object(map) => map,
                        other => return Err(self.not_applicable(position, other)),
                    };
                    if is_last {
                        map.insert(key.clone(), new_value);
                        return Ok(());
                    }
                    map.entry(key.clone()).or_insert(Value::Null)
                }
                Segment::Index(index) => {
                    if current.is_null() {
                        *current = Value::Array(Vec::new());
                    }
                    let items = match current {
                        Value::Array(items) => items,
                        other => return Err(self.not_applicable(position, other)),
                    };
                    if *index > items.len() {
                        return Err(ChangeLogError::PathNotApplicable {
                            path: self.raw.clone(),
                            reason: format!(
                                "index {} is past the end of an array of length {}",
                                index,
                                items.len()
                            ),
                        });
                    }
                    if *index == items.len() {
                        items.push(Value::Null);
                    }
                    if is_last {
                        items[*index] = new_value;
                        return Ok(());
                    }
                    &mut items[*index]
                }
            };
        }

        Ok(())
    }

    fn not_applicable(&self, position: usize, found: &Value) -> ChangeLogError {
        let kind = match found {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Null => "null",
        };
        ChangeLogError::PathNotApplicable {
            path: self.raw.clone(),
            reason: format!("segment {} addresses into a {}", position, kind),
        }
    }
}

impl FromStr for FieldPath {
    type Err = ChangeLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
