//! Variable reference resolution for configuration values.
//!
//! Supports `${section.field}` syntax for cross-referencing values.
//! Use `$${...}` to escape and produce a literal `${...}`.
//!
//! A string that is exactly one placeholder takes the referenced value as is,
//! so `"${db.port}"` can become an integer and `"${db}"` a whole table.
//! Placeholders mixed with text are spliced in as strings, which only works
//! for scalars.

use crate::value::Value;
use crate::{Error, ErrorMode};

/// Nesting beyond this many references is treated as circular.
pub const MAX_DEPTH: usize = 64;

/// The keys currently being resolved, outermost first.
///
/// A lookup that needs `name` while `name` is already on the trail has hit a
/// cycle. The trail travels through delegators, so cycles spanning several
/// registries are caught too.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    keys: Vec<String>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn depth(&self) -> usize {
        self.keys.len()
    }

    pub fn push(&mut self, key: &str) {
        self.keys.push(key.to_string());
    }

    pub fn pop(&mut self) {
        self.keys.pop();
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    Literal(String),
    Reference(String),
}

/// Resolves every `${...}` in `value`, descending into tables and arrays.
///
/// `lookup` fetches the already-resolved value of a referenced key. Unknown,
/// circular and non-scalar references go through `mode`: the placeholder is
/// kept verbatim unless the mode raises.
pub(crate) fn resolve_value<F>(
    value: &mut Value,
    mode: ErrorMode,
    trail: &mut Trail,
    lookup: &mut F,
) -> Result<(), Error>
where
    F: FnMut(&str, &mut Trail) -> Result<Option<Value>, Error>,
{
    match value {
        Value::String(s) => {
            let resolved = resolve_string(s, mode, trail, lookup)?;
            *value = resolved;
            Ok(())
        }
        Value::Table(table) => {
            for item in table.values_mut() {
                resolve_value(item, mode, trail, lookup)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_value(item, mode, trail, lookup)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn resolve_string<F>(
    s: &str,
    mode: ErrorMode,
    trail: &mut Trail,
    lookup: &mut F,
) -> Result<Value, Error>
where
    F: FnMut(&str, &mut Trail) -> Result<Option<Value>, Error>,
{
    let segments = parse(s);

    if let [Segment::Reference(name)] = segments.as_slice() {
        return Ok(dereference(name, mode, trail, lookup)?
            .unwrap_or_else(|| Value::String(s.to_string())));
    }

    let mut result = String::with_capacity(s.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Reference(name) => match dereference(&name, mode, trail, lookup)? {
                Some(value) if value.is_scalar() => result.push_str(&value.to_string()),
                Some(_) => {
                    mode.handle(Error::NonScalarReference(name.clone()), &name)?;
                    push_placeholder(&mut result, &name);
                }
                None => push_placeholder(&mut result, &name),
            },
        }
    }

    Ok(Value::String(result))
}

/// Looks up one referenced key, applying the error mode when it cannot be
/// resolved. `Ok(None)` means "leave the placeholder in place".
fn dereference<F>(
    name: &str,
    mode: ErrorMode,
    trail: &mut Trail,
    lookup: &mut F,
) -> Result<Option<Value>, Error>
where
    F: FnMut(&str, &mut Trail) -> Result<Option<Value>, Error>,
{
    if trail.contains(name) || trail.depth() >= MAX_DEPTH {
        mode.handle(Error::CircularReference(name.to_string()), name)?;
        return Ok(None);
    }

    match lookup(name, trail) {
        Ok(Some(value)) if !value.is_null() => Ok(Some(value)),
        Ok(_) => {
            mode.handle(Error::UnknownReference(name.to_string()), name)?;
            Ok(None)
        }
        Err(err) => {
            mode.handle(err, name)?;
            Ok(None)
        }
    }
}

fn push_placeholder(out: &mut String, name: &str) {
    out.push_str("${");
    out.push_str(name);
    out.push('}');
}

/// Splits a string into literal text and references.
///
/// `$${` is an escaped `${`. An unclosed `${` or an empty `${}` stays literal.
fn parse(s: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("$${") {
            literal.push_str("${");
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            match after.find('}') {
                Some(end) if end > 0 => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Reference(after[..end].to_string()));
                    rest = &after[end + 1..];
                }
                _ => {
                    literal.push_str("${");
                    rest = after;
                }
            }
        } else {
            literal.push('$');
            rest = &tail[1..];
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}
