//! Cursors: a root key plus a path into its document
//!
//! Building a cursor never touches the store. Every terminal method snapshots
//! the cursor's path and runs one cycle against the current stored document:
//! reads without a lock, everything else under the root key's lock.

use crate::core::error::{CodecError, Result};
use crate::engine::{apply, lookup, Context, Operation};
use crate::types::{Document, Key, Path};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// How [`Cursor::member`] interprets a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Operation names resolve to operations, anything else to a child
    #[default]
    Auto,
    /// Always a child, even when the name is an operation such as `push`
    Property,
    /// Always an operation
    Function,
}

/// What a name resolved to
#[derive(Clone)]
pub enum Member {
    /// Child cursor
    Node(Cursor),
    /// Operation waiting for its arguments
    Method(Method),
}

/// An operation name bound to a cursor
#[derive(Clone)]
pub struct Method {
    cursor: Cursor,
    name: String,
}

impl Method {
    /// Operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the operation with `args`
    pub async fn call(self, args: Vec<Document>) -> Result<Option<Document>> {
        self.cursor.call(&self.name, args).await
    }
}

/// Lazily-resolved location inside a stored document
#[derive(Clone)]
pub struct Cursor {
    ctx: Context,
    root_key: String,
    path: Path,
}

impl Cursor {
    pub(crate) fn new(ctx: Context, root_key: impl Into<String>) -> Self {
        Self {
            ctx,
            root_key: root_key.into(),
            path: Path::root(),
        }
    }

    /// Root key of the document this cursor points into
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// Path below the root key
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Child cursor one level down. No I/O.
    pub fn navigate(&self, key: impl Into<Key>) -> Cursor {
        Cursor {
            ctx: self.ctx.clone(),
            root_key: self.root_key.clone(),
            path: self.path.child(key),
        }
    }

    /// Child cursor for `key`, even when `key` names an operation
    pub fn prop(&self, key: impl Into<Key>) -> Cursor {
        self.navigate(key)
    }

    /// Resolve `name` as a child or an operation
    pub fn member(&self, name: &str, access: Access) -> Member {
        let is_method = match access {
            Access::Auto => Operation::is_known(name),
            Access::Property => false,
            Access::Function => true,
        };
        if is_method {
            Member::Method(Method {
                cursor: self.clone(),
                name: name.to_string(),
            })
        } else {
            Member::Node(self.navigate(name))
        }
    }

    /// Invoke `name` as an operation on the value here
    pub async fn call(&self, name: &str, args: Vec<Document>) -> Result<Option<Document>> {
        let op = Operation::parse(name, args)?;
        self.invoke(op).await
    }

    /// Run `op` on the value here under the lock.
    ///
    /// Non-mutating operations never write back.
    pub async fn invoke(&self, op: Operation) -> Result<Option<Document>> {
        let path = self.path.clone();
        let write_back = op.mutates();
        let name = op.name();
        self.ctx
            .mutate(&self.root_key, name, move |doc| {
                let out = apply(doc, &path, |slot| op.apply(slot, &path))?;
                Ok((out, write_back))
            })
            .await
    }

    /// Current value here, or `None` if any segment is missing
    pub async fn get(&self) -> Result<Option<Document>> {
        let path = self.path.clone();
        self.ctx
            .read(&self.root_key, "get", move |doc| Ok(doc.and_then(|d| lookup(d, &path)).cloned()))
            .await
    }

    /// Current value here, deserialized into `T`
    pub async fn get_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.get().await? {
            Some(value) => {
                let typed = serde_json::from_value(value).map_err(|e| CodecError::Conversion(e.to_string()))?;
                Ok(Some(typed))
            }
            None => Ok(None),
        }
    }

    /// Replace the value here, creating missing intermediates. Returns the
    /// value written.
    pub async fn set(&self, value: impl Into<Document>) -> Result<Document> {
        let path = self.path.clone();
        let value = value.into();
        self.ctx
            .mutate(&self.root_key, "set", move |doc| {
                apply(doc, &path, |slot| {
                    *slot = Some(value.clone());
                    Ok(())
                })?;
                Ok((value, true))
            })
            .await
    }

    /// Serialize `value` and store it here
    pub async fn set_from<T: Serialize + ?Sized>(&self, value: &T) -> Result<Document> {
        let value = serde_json::to_value(value).map_err(|e| CodecError::Conversion(e.to_string()))?;
        self.set(value).await
    }

    /// Remove `key` below this cursor. Returns whether something was there.
    pub async fn delete(&self, key: impl Into<Key>) -> Result<bool> {
        let path = self.path.child(key);
        self.ctx
            .mutate(&self.root_key, "delete", move |doc| {
                let removed = apply(doc, &path, |slot| Ok(slot.take().is_some()))?;
                Ok((removed, removed))
            })
            .await
    }

    /// Whether `key` below this cursor holds a value. Never writes.
    pub async fn has(&self, key: impl Into<Key>) -> Result<bool> {
        let path = self.path.child(key);
        self.ctx
            .mutate(&self.root_key, "has", move |doc| {
                let present = apply(doc, &path, |slot| Ok(slot.is_some()))?;
                Ok((present, false))
            })
            .await
    }

    /// Read-modify-write the value here.
    ///
    /// `f` receives the current value (`None` when absent) and may replace
    /// or take it; the result is always written back.
    pub async fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Option<Document>) -> R + Send,
        R: Send,
    {
        let path = self.path.clone();
        self.ctx
            .mutate(&self.root_key, "update", move |doc| {
                let out = apply(doc, &path, |slot| Ok(f(slot)))?;
                Ok((out, true))
            })
            .await
    }

    /// Append `items`; returns the new length
    pub async fn push(&self, items: Vec<Document>) -> Result<usize> {
        let len = self.invoke(Operation::Push(items)).await?;
        Ok(as_len(len))
    }

    /// Remove and return the last element
    pub async fn pop(&self) -> Result<Option<Document>> {
        self.invoke(Operation::Pop).await
    }

    /// Remove and return the first element
    pub async fn shift(&self) -> Result<Option<Document>> {
        self.invoke(Operation::Shift).await
    }

    /// Prepend `items`; returns the new length
    pub async fn unshift(&self, items: Vec<Document>) -> Result<usize> {
        let len = self.invoke(Operation::Unshift(items)).await?;
        Ok(as_len(len))
    }

    /// Copy of the elements in `[start, end)`
    pub async fn slice(&self, start: i64, end: Option<i64>) -> Result<Vec<Document>> {
        let range = self.invoke(Operation::Slice { start, end }).await?;
        Ok(into_elements(range))
    }

    /// Remove `delete_count` elements at `start`, insert `items` there and
    /// return the removed elements
    pub async fn splice(&self, start: i64, delete_count: Option<usize>, items: Vec<Document>) -> Result<Vec<Document>> {
        let removed = self
            .invoke(Operation::Splice {
                start,
                delete_count,
                items,
            })
            .await?;
        Ok(into_elements(removed))
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("namespace", &self.ctx.namespace())
            .field("root_key", &self.root_key)
            .field("path", &self.path.to_string())
            .finish()
    }
}

fn as_len(value: Option<Document>) -> usize {
    value.and_then(|v| v.as_u64()).unwrap_or_default() as usize
}

fn into_elements(value: Option<Document>) -> Vec<Document> {
    match value {
        Some(Document::Array(items)) => items,
        _ => Vec::new(),
    }
}
