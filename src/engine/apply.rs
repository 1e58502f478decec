//! Nested path traversal over a working copy of a document.
//!
//! Two traversal policies share this module:
//! - [`apply`] is write-through: missing intermediates become empty objects
//!   in the working copy, and the closure receives the target *slot*.
//! - [`lookup`] is pure: the first missing segment yields `None` and the
//!   document is never touched.

use crate::core::error::{Error, Result};
use crate::types::{value_type_name, Document, Key, Path};
use serde_json::Map;

/// Largest run of `null`s an out-of-range array index may pad
const MAX_ARRAY_PADDING: usize = 1 << 16;

/// Run `f` on the slot addressed by `path`, creating intermediates.
///
/// The slot is `Some(value)` when something is stored there and `None`
/// otherwise. Whatever `f` leaves in the slot is written back into the
/// working copy: leaving `None` removes an object field, or leaves a `null`
/// hole in an array so later indices keep their positions. Setting an array
/// index past the end pads the gap with `null`.
///
/// With an empty path the slot is the whole document; a document emptied by
/// `f` becomes `null`.
pub fn apply<R, F>(doc: &mut Document, path: &Path, f: F) -> Result<R>
where
    F: FnOnce(&mut Option<Document>) -> Result<R>,
{
    let Some((last, parents)) = path.keys().split_last() else {
        let mut slot = Some(std::mem::take(doc));
        let outcome = f(&mut slot);
        *doc = slot.unwrap_or(Document::Null);
        return outcome;
    };

    let mut container = doc;
    for (depth, key) in parents.iter().enumerate() {
        container = descend(container, key, &path.keys()[..=depth])?;
    }

    apply_at(container, last, path, f)
}

/// Read the node addressed by `path` without modifying anything.
///
/// Returns `None` as soon as a segment is missing or a scalar sits where a
/// container is needed.
pub fn lookup<'a>(doc: &'a Document, path: &Path) -> Option<&'a Document> {
    path.iter().try_fold(doc, |node, key| match node {
        Document::Object(map) => map.get(key.as_str()),
        Document::Array(items) => key.as_index().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Step into `key`, materializing an empty object when it is missing.
fn descend<'a>(container: &'a mut Document, key: &Key, walked: &[Key]) -> Result<&'a mut Document> {
    if container.is_null() {
        *container = Document::Object(Map::new());
    }

    match container {
        Document::Object(map) => {
            let child = map
                .entry(key.as_str())
                .or_insert_with(|| Document::Object(Map::new()));
            if child.is_null() {
                *child = Document::Object(Map::new());
            }
            Ok(child)
        }
        Document::Array(items) => {
            let index = array_index(key, walked)?;
            grow_to(items, index, walked)?;
            let child = &mut items[index];
            if child.is_null() {
                *child = Document::Object(Map::new());
            }
            Ok(child)
        }
        other => Err(not_a_container(other, walked)),
    }
}

fn apply_at<R, F>(container: &mut Document, key: &Key, path: &Path, f: F) -> Result<R>
where
    F: FnOnce(&mut Option<Document>) -> Result<R>,
{
    if container.is_null() {
        *container = Document::Object(Map::new());
    }

    match container {
        Document::Object(map) => {
            let mut slot = map.remove(key.as_str());
            let outcome = f(&mut slot);
            if let Some(value) = slot {
                map.insert(key.as_str().to_string(), value);
            }
            outcome
        }
        Document::Array(items) => {
            let index = array_index(key, path.keys())?;
            if index > items.len() {
                check_padding(items.len(), index, path.keys())?;
            }
            let mut slot = items.get_mut(index).map(std::mem::take);
            let outcome = f(&mut slot);
            match slot {
                Some(value) => {
                    grow_to(items, index, path.keys())?;
                    items[index] = value;
                }
                None => {
                    if let Some(hole) = items.get_mut(index) {
                        *hole = Document::Null;
                    }
                }
            }
            outcome
        }
        other => Err(not_a_container(other, &path.keys()[..path.len() - 1])),
    }
}

fn array_index(key: &Key, walked: &[Key]) -> Result<usize> {
    key.as_index().ok_or_else(|| {
        Error::usage(format!(
            "key '{}' is not an array index at {}",
            key,
            Path::from_keys(walked.iter())
        ))
    })
}

/// Make `index` addressable, padding with `null`
fn grow_to(items: &mut Vec<Document>, index: usize, walked: &[Key]) -> Result<()> {
    if index < items.len() {
        return Ok(());
    }
    check_padding(items.len(), index, walked)?;
    items.resize(index + 1, Document::Null);
    Ok(())
}

fn check_padding(len: usize, index: usize, walked: &[Key]) -> Result<()> {
    if index - len > MAX_ARRAY_PADDING || index.checked_add(1).is_none() {
        return Err(Error::usage(format!(
            "index {} is too far past the end of the array ({} elements) at {}",
            index,
            len,
            Path::from_keys(walked.iter())
        )));
    }
    Ok(())
}

fn not_a_container(node: &Document, walked: &[Key]) -> Error {
    Error::usage(format!(
        "cannot descend into {} at {}",
        value_type_name(node),
        Path::from_keys(walked.iter())
    ))
}
