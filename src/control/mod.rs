//! The control plane namespace: endpoints anchored under device identities,
//! each holding named readable/writable textual attributes.
//!
//! Registrations are scoped: [`EndpointHandle`] and [`AttributeHandle`]
//! remove themselves on drop. A constructor that acquires registrations in
//! order and bails out early therefore unwinds them in exact reverse order
//! without any manual cleanup branches.
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::instrument;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Serialize)]
pub enum Error {
    EndpointAlreadyExists { path: String },
    AttributeAlreadyExists { path: String, name: String },
    NoSuchEndpoint { path: String },
    NoSuchAttribute { path: String, name: String },
    /// The stored input did not satisfy the attribute's contract.
    InvalidInput { reason: String },
    Logic { reason: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

/// A single readable/writable textual control value.
///
/// `show` renders the current value; `store` parses and applies `input`,
/// reporting how many bytes it consumed. Both must be non-blocking: they are
/// called concurrently with any number of in-flight requests.
pub trait Attribute: Debug {
    fn show(&self) -> String;
    fn store(&self, input: &str) -> Result<usize>;
}

pub type SyncAttribute = Arc<dyn Attribute + Send + Sync + 'static>;

#[derive(Debug, Default)]
struct Endpoint {
    attributes: HashMap<String, SyncAttribute>,
}

/// The namespace all control endpoints live in.
#[derive(Clone, Debug, Default)]
pub struct ControlRegistry {
    inner: Arc<Mutex<HashMap<String, Endpoint>>>,
}

impl ControlRegistry {
    fn acquire_lock(&self) -> Result<MutexGuard<HashMap<String, Endpoint>>> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::Logic {
                reason: "Unable to acquire lock for ControlRegistry - poisoned...".to_string(),
            }),
        }
    }

    /// Creates an empty endpoint at `"<parent>/<name>"`. Paths are unique.
    #[instrument(name = "control::create_endpoint", level = "info", skip(self))]
    pub fn create_endpoint(&self, parent: &str, name: &str) -> Result<EndpointHandle> {
        let path = format!("{}/{}", parent, name);

        let mut guard = self.acquire_lock()?;
        if guard.contains_key(&path) {
            return Err(Error::EndpointAlreadyExists { path });
        }

        guard.insert(path.clone(), Endpoint::default());
        Ok(EndpointHandle {
            registry: self.clone(),
            path,
        })
    }

    /// Registers `attribute` under an existing endpoint.
    #[instrument(name = "control::create_attribute", level = "info", skip(self, attribute))]
    pub fn create_attribute(
        &self,
        path: &str,
        name: &str,
        attribute: SyncAttribute,
    ) -> Result<AttributeHandle> {
        let mut guard = self.acquire_lock()?;
        let endpoint = guard.get_mut(path).ok_or(Error::NoSuchEndpoint {
            path: path.to_string(),
        })?;

        if endpoint.attributes.contains_key(name) {
            return Err(Error::AttributeAlreadyExists {
                path: path.to_string(),
                name: name.to_string(),
            });
        }

        endpoint.attributes.insert(name.to_string(), attribute);
        Ok(AttributeHandle {
            registry: self.clone(),
            path: path.to_string(),
            name: name.to_string(),
        })
    }

    /// Reads an attribute's current textual value.
    pub fn show(&self, path: &str, name: &str) -> Result<String> {
        let attribute = self.resolve(path, name)?;
        Ok(attribute.show())
    }

    /// Writes `input` into an attribute, returning the number of bytes
    /// consumed. A rejected store leaves the attribute's value unchanged.
    pub fn store(&self, path: &str, name: &str, input: &str) -> Result<usize> {
        let attribute = self.resolve(path, name)?;
        attribute.store(input)
    }

    pub fn endpoint_exists(&self, path: &str) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.contains_key(path))
            .unwrap_or(false)
    }

    // The attribute is called outside the registry lock: stores must be able
    // to race each other and in-flight shows freely.
    fn resolve(&self, path: &str, name: &str) -> Result<SyncAttribute> {
        let guard = self.acquire_lock()?;
        let endpoint = guard.get(path).ok_or(Error::NoSuchEndpoint {
            path: path.to_string(),
        })?;
        endpoint
            .attributes
            .get(name)
            .cloned()
            .ok_or(Error::NoSuchAttribute {
                path: path.to_string(),
                name: name.to_string(),
            })
    }

    fn remove_endpoint(&self, path: &str) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.remove(path);
        }
    }

    fn remove_attribute(&self, path: &str, name: &str) {
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(endpoint) = guard.get_mut(path) {
                endpoint.attributes.remove(name);
            }
        }
    }
}

/// Scoped endpoint registration: dropping it removes the endpoint (and any
/// attributes still registered on it) from the namespace.
#[derive(Debug)]
pub struct EndpointHandle {
    registry: ControlRegistry,
    path: String,
}

impl EndpointHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for EndpointHandle {
    fn drop(&mut self) {
        self.registry.remove_endpoint(&self.path);
    }
}

/// Scoped attribute registration: dropping it removes just the attribute.
#[derive(Debug)]
pub struct AttributeHandle {
    registry: ControlRegistry,
    path: String,
    name: String,
}

impl AttributeHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for AttributeHandle {
    fn drop(&mut self) {
        self.registry.remove_attribute(&self.path, &self.name);
    }
}
