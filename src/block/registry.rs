//! Registry that resolves device names into open device handles.
//!
//! This is the piece that makes "no device handle remains open" observable:
//! every successful [`DeviceRegistry::lookup`] bumps the device's open-handle
//! count and every [`DeviceHandle`] drop releases it again. Devices are
//! registered once (by the host configuration) and looked up by targets at
//! construction time.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::instrument;

use super::{Error, Mode, Request, Result, SyncBlockDevice};

#[derive(Debug)]
struct Entry {
    device: SyncBlockDevice,
    open_handles: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DeviceRegistry {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl DeviceRegistry {
    fn acquire_lock(&self) -> Result<MutexGuard<HashMap<String, Entry>>> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::Logic {
                reason: "Unable to acquire lock for DeviceRegistry - poisoned...".to_string(),
            }),
        }
    }

    /// Registers a device under `name`. Names are unique.
    #[instrument(name = "block::registry::register", level = "info", skip(self, device))]
    pub fn register(&self, name: &str, device: SyncBlockDevice) -> Result<()> {
        let mut guard = self.acquire_lock()?;
        if guard.contains_key(name) {
            return Err(Error::AlreadyRegistered {
                name: name.to_string(),
            });
        }

        guard.insert(
            name.to_string(),
            Entry {
                device,
                open_handles: 0,
            },
        );
        Ok(())
    }

    /// Resolves `name` into an open [`DeviceHandle`] with the given access
    /// mode, bumping the device's open-handle count.
    #[instrument(name = "block::registry::lookup", level = "info", skip(self))]
    pub fn lookup(&self, name: &str, mode: Mode) -> Result<DeviceHandle> {
        let mut guard = self.acquire_lock()?;
        let entry = guard.get_mut(name).ok_or(Error::NotFound {
            name: name.to_string(),
        })?;

        entry.open_handles += 1;
        Ok(DeviceHandle {
            registry: self.clone(),
            name: name.to_string(),
            mode,
            device: entry.device.clone(),
        })
    }

    /// How many handles are currently open against `name`. Unknown names
    /// report 0.
    pub fn open_handles(&self, name: &str) -> usize {
        self.inner
            .lock()
            .map(|guard| guard.get(name).map_or(0, |entry| entry.open_handles))
            .unwrap_or(0)
    }
}

/// An open, exclusively-owned reference to a registered device.
///
/// Dropping the handle releases it exactly once; the device itself stays
/// registered for other users.
#[derive(Debug)]
pub struct DeviceHandle {
    registry: DeviceRegistry,
    name: String,
    mode: Mode,
    device: SyncBlockDevice,
}

impl DeviceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn capacity(&self) -> u64 {
        self.device.capacity()
    }

    /// Forwards a request to the device. The device owns completion from
    /// this point on.
    pub async fn submit(&self, request: Request) {
        self.device.submit(request).await
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.registry.inner.lock() {
            if let Some(entry) = guard.get_mut(&self.name) {
                entry.open_handles = entry.open_handles.saturating_sub(1);
            }
        }
    }
}
