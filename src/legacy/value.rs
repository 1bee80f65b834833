//! Tagged values for the legacy environment tables.
//!
//! # Responsibilities
//! - Model table entries as `Scalar`, `List` or `Map` instead of untyped arrays
//! - Parse bracketed parameter names (`name`, `name[x]`, `name[x][y]`, `name[]`)
//! - Insert values along a bracket path with PHP array semantics
//!
//! # Design Decisions
//! - `Table` keeps insertion order, like the arrays the application iterates
//! - A container is a `List` while its keys are exactly `0..n`; the first
//!   non-sequential key turns it into a `Map` with the indices as keys
//! - Only the base name is normalized (`.` and ` ` become `_`)
//! - Bracket groups are scanned in a loop and capped at
//!   `MAX_NESTING_DEPTH`; deeper names are dropped whole

use indexmap::IndexMap;
use serde::Serialize;

/// Deepest bracket path a parameter name may have (`max_input_nesting_level`).
pub const MAX_NESTING_DEPTH: usize = 64;

/// One legacy table: ordered string keys to values.
pub type Table = IndexMap<String, Value>;

/// A single table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(String),
    List(Vec<Value>),
    Map(Table),
}

impl Value {
    /// Returns the string if this is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a child by key. Lists accept their decimal indices.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(table) => table.get(key),
            Value::List(items) => as_index(key).and_then(|i| items.get(i)),
            Value::Scalar(_) => None,
        }
    }

    /// Follows a sequence of keys.
    pub fn get_path<'a, I>(&self, keys: I) -> Option<&Value>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().try_fold(self, |value, key| value.get(key))
    }

    /// Empty container suited for the first key that will be written into it.
    fn container_for(key: &str) -> Value {
        if key.is_empty() || key == "0" {
            Value::List(Vec::new())
        } else {
            Value::Map(Table::new())
        }
    }

    /// Returns the slot for `key`, creating it (or converting a list) as needed.
    fn slot(&mut self, key: &str) -> &mut Value {
        if let Value::List(items) = self {
            let sequential = key.is_empty() || as_index(key).is_some_and(|i| i <= items.len());
            if !sequential {
                let items = std::mem::take(items);
                *self = Value::Map(list_to_table(items));
            }
        } else if let Value::Scalar(_) = self {
            *self = Value::container_for(key);
        }

        match self {
            Value::List(items) => match as_index(key) {
                Some(i) if i < items.len() => &mut items[i],
                _ => {
                    let len = items.len();
                    items.push(Value::Scalar(String::new()));
                    &mut items[len]
                }
            },
            Value::Map(table) => {
                let key = if key.is_empty() {
                    next_index(table).to_string()
                } else {
                    key.to_string()
                };
                table.entry(key).or_insert_with(|| Value::Scalar(String::new()))
            }
            Value::Scalar(_) => unreachable!("scalar replaced by a container above"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

/// Canonical decimal index: `0` or digits without a leading zero.
fn as_index(key: &str) -> Option<usize> {
    let canonical = key == "0"
        || (!key.is_empty() && !key.starts_with('0') && key.bytes().all(|b| b.is_ascii_digit()));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

fn next_index(table: &Table) -> usize {
    table
        .keys()
        .filter_map(|k| as_index(k))
        .max()
        .map_or(0, |max| max + 1)
}

fn list_to_table(items: Vec<Value>) -> Table {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i.to_string(), v))
        .collect()
}

/// Splits a parameter name into its base and bracket segments.
///
/// Returns `None` when the base is empty (`[x]=1` is dropped, as the
/// application's own parser does) or when the name nests deeper than
/// `MAX_NESTING_DEPTH`. An unterminated first bracket is kept literally,
/// with the `[` replaced by `_`.
pub fn parse_key(raw: &str) -> Option<(String, Vec<String>)> {
    let raw = raw.trim_start_matches(' ');
    let (base, rest) = match raw.find('[') {
        Some(i) => (&raw[..i], &raw[i..]),
        None => (raw, ""),
    };
    if base.is_empty() {
        return None;
    }

    let mut name = normalize_base(base);
    let segments = match parse_segments(rest) {
        Some(segments) if segments.len() > MAX_NESTING_DEPTH => {
            tracing::debug!(parameter = %name, "Dropping parameter nested too deeply");
            return None;
        }
        Some(segments) => segments,
        None => {
            name.push('_');
            name.push_str(&rest[1..]);
            Vec::new()
        }
    };
    Some((name, segments))
}

/// Collects consecutive `[seg]` groups. Text after the last closed group is
/// ignored; an unterminated group is only an error (`None`) when it is the
/// first. Stops one group past `MAX_NESTING_DEPTH`.
fn parse_segments(mut rest: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(end) = inner.find(']') else {
            if segments.is_empty() {
                return None;
            }
            break;
        };
        segments.push(inner[..end].to_string());
        if segments.len() > MAX_NESTING_DEPTH {
            break;
        }
        rest = &inner[end + 1..];
    }
    Some(segments)
}

fn normalize_base(base: &str) -> String {
    base.chars()
        .map(|c| if c == '.' || c == ' ' { '_' } else { c })
        .collect()
}

/// Inserts `value` at `table[base][keys...]`.
pub fn insert_path(table: &mut Table, base: &str, keys: &[String], value: Value) {
    let Some((first, rest)) = keys.split_first() else {
        table.insert(base.to_string(), value);
        return;
    };

    let mut slot = table
        .entry(base.to_string())
        .or_insert_with(|| Value::container_for(first))
        .slot(first);
    for key in rest {
        slot = slot.slot(key);
    }
    *slot = value;
}

/// Inserts one `name=value` pair, honouring bracket syntax in `name`.
pub fn insert_pair(table: &mut Table, name: &str, value: impl Into<Value>) {
    if let Some((base, keys)) = parse_key(name) {
        insert_path(table, &base, &keys, value.into());
    }
}

/// Parses an `application/x-www-form-urlencoded` string into a nested table.
pub fn parse_form(input: &str) -> Table {
    let mut table = Table::new();
    extend_form(&mut table, input.as_bytes());
    table
}

/// Adds the pairs of an urlencoded buffer to an existing table.
pub fn extend_form(table: &mut Table, input: &[u8]) {
    for (name, value) in url::form_urlencoded::parse(input) {
        insert_pair(table, &name, value.into_owned());
    }
}
