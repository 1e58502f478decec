//! Synchronous facade over [`Registry`] and [`Cursor`]
//!
//! Each call drives the async operation to completion on a private
//! current-thread runtime. Calling in from a thread that is already inside a
//! tokio runtime is rejected: blocking there would stall that runtime.

use crate::core::error::{Error, Result};
use crate::cursor::{Access, Cursor, Member};
use crate::engine::Operation;
use crate::registry::Registry;
use crate::types::{Document, Key, Path};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};

#[derive(Clone)]
struct Driver {
    runtime: Arc<Runtime>,
}

impl Driver {
    fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if Handle::try_current().is_ok() {
            return Err(Error::usage(
                "blocking facade called from inside an async runtime; use the async registry instead",
            ));
        }
        self.runtime.block_on(fut)
    }
}

/// Blocking counterpart of [`Registry`]
#[derive(Clone)]
pub struct BlockingRegistry {
    inner: Registry,
    driver: Driver,
}

impl BlockingRegistry {
    /// Wrap `registry` with its own runtime
    pub fn new(registry: Registry) -> Result<Self> {
        Ok(Self {
            inner: registry,
            driver: Driver::new()?,
        })
    }

    /// The async registry underneath
    pub fn as_async(&self) -> &Registry {
        &self.inner
    }

    /// Cursor at the root of `root_key`. No I/O.
    pub fn get(&self, root_key: &str) -> Result<BlockingCursor> {
        Ok(BlockingCursor {
            inner: self.inner.get(root_key)?,
            driver: self.driver.clone(),
        })
    }

    /// Replace the whole document under `root_key`
    pub fn set(&self, root_key: &str, value: impl Into<Document>) -> Result<Document> {
        self.driver.run(self.inner.set(root_key, value))
    }

    /// Remove the document under `root_key`
    pub fn delete(&self, root_key: &str) -> Result<bool> {
        self.driver.run(self.inner.delete(root_key))
    }

    /// Whether a document is stored under `root_key`
    pub fn has(&self, root_key: &str) -> Result<bool> {
        self.driver.run(self.inner.has(root_key))
    }
}

/// Blocking counterpart of [`Member`]
pub enum BlockingMember {
    /// Child cursor
    Node(BlockingCursor),
    /// Operation waiting for its arguments
    Method(BlockingMethod),
}

/// Operation name bound to a blocking cursor
pub struct BlockingMethod {
    cursor: BlockingCursor,
    name: String,
}

impl BlockingMethod {
    /// Operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the operation with `args`
    pub fn call(self, args: Vec<Document>) -> Result<Option<Document>> {
        self.cursor.call(&self.name, args)
    }
}

/// Blocking counterpart of [`Cursor`]
#[derive(Clone)]
pub struct BlockingCursor {
    inner: Cursor,
    driver: Driver,
}

impl BlockingCursor {
    fn wrap(&self, inner: Cursor) -> Self {
        Self {
            inner,
            driver: self.driver.clone(),
        }
    }

    /// Root key of the document this cursor points into
    pub fn root_key(&self) -> &str {
        self.inner.root_key()
    }

    /// Path below the root key
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Child cursor one level down. No I/O.
    pub fn navigate(&self, key: impl Into<Key>) -> Self {
        self.wrap(self.inner.navigate(key))
    }

    /// Child cursor for `key`, even when `key` names an operation
    pub fn prop(&self, key: impl Into<Key>) -> Self {
        self.wrap(self.inner.prop(key))
    }

    /// Resolve `name` as a child or an operation
    pub fn member(&self, name: &str, access: Access) -> BlockingMember {
        match self.inner.member(name, access) {
            Member::Node(node) => BlockingMember::Node(self.wrap(node)),
            Member::Method(method) => BlockingMember::Method(BlockingMethod {
                cursor: self.clone(),
                name: method.name().to_string(),
            }),
        }
    }

    /// Invoke `name` as an operation on the value here
    pub fn call(&self, name: &str, args: Vec<Document>) -> Result<Option<Document>> {
        self.driver.run(self.inner.call(name, args))
    }

    /// Run `op` on the value here
    pub fn invoke(&self, op: Operation) -> Result<Option<Document>> {
        self.driver.run(self.inner.invoke(op))
    }

    /// Current value here
    pub fn get(&self) -> Result<Option<Document>> {
        self.driver.run(self.inner.get())
    }

    /// Current value here, deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.driver.run(self.inner.get_as())
    }

    /// Replace the value here
    pub fn set(&self, value: impl Into<Document>) -> Result<Document> {
        self.driver.run(self.inner.set(value))
    }

    /// Serialize `value` and store it here
    pub fn set_from<T: Serialize + ?Sized>(&self, value: &T) -> Result<Document> {
        self.driver.run(self.inner.set_from(value))
    }

    /// Remove `key` below this cursor
    pub fn delete(&self, key: impl Into<Key>) -> Result<bool> {
        self.driver.run(self.inner.delete(key))
    }

    /// Whether `key` below this cursor holds a value
    pub fn has(&self, key: impl Into<Key>) -> Result<bool> {
        self.driver.run(self.inner.has(key))
    }

    /// Read-modify-write the value here
    pub fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Option<Document>) -> R + Send,
        R: Send,
    {
        self.driver.run(self.inner.update(f))
    }

    /// Append `items`; returns the new length
    pub fn push(&self, items: Vec<Document>) -> Result<usize> {
        self.driver.run(self.inner.push(items))
    }

    /// Remove and return the last element
    pub fn pop(&self) -> Result<Option<Document>> {
        self.driver.run(self.inner.pop())
    }

    /// Remove and return the first element
    pub fn shift(&self) -> Result<Option<Document>> {
        self.driver.run(self.inner.shift())
    }

    /// Prepend `items`; returns the new length
    pub fn unshift(&self, items: Vec<Document>) -> Result<usize> {
        self.driver.run(self.inner.unshift(items))
    }

    /// Copy of the elements in `[start, end)`
    pub fn slice(&self, start: i64, end: Option<i64>) -> Result<Vec<Document>> {
        self.driver.run(self.inner.slice(start, end))
    }

    /// Remove `delete_count` elements at `start` and insert `items` there
    pub fn splice(&self, start: i64, delete_count: Option<usize>, items: Vec<Document>) -> Result<Vec<Document>> {
        self.driver.run(self.inner.splice(start, delete_count, items))
    }
}
