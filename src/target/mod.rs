//! The table of live proxy targets.
//!
//! This is the host side of the lifecycle: it owns the device and control
//! registries, serializes construction/destruction, and hands out shared
//! references for request handling. [`crate::proxy::ProxyTarget`] itself
//! stays free of any naming or table vocabulary.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{event, instrument, Level};

use crate::block::registry::DeviceRegistry;
use crate::block::Mode;
use crate::control::ControlRegistry;
use crate::error::{Error, Result};
use crate::proxy::ProxyTarget;

#[derive(Clone, Debug)]
pub struct TargetTable {
    targets: Arc<Mutex<HashMap<String, Arc<ProxyTarget>>>>,
    devices: DeviceRegistry,
    control: ControlRegistry,
}

impl TargetTable {
    pub fn new(devices: DeviceRegistry, control: ControlRegistry) -> Self {
        Self {
            targets: Arc::new(Mutex::new(HashMap::new())),
            devices,
            control,
        }
    }

    fn acquire_lock(&self) -> Result<MutexGuard<HashMap<String, Arc<ProxyTarget>>>> {
        match self.targets.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::Logic {
                reason: "Unable to acquire lock for TargetTable - poisoned...".to_string(),
            }),
        }
    }

    /// Constructs a target from its argument list and registers it under
    /// `name`. Construction errors propagate verbatim; nothing is left
    /// behind on failure.
    #[instrument(name = "target::create", level = "info", skip(self))]
    pub fn create(&self, name: &str, args: &[String], mode: Mode) -> Result<()> {
        let mut guard = self.acquire_lock()?;
        if guard.contains_key(name) {
            return Err(Error::TargetAlreadyExists {
                name: name.to_string(),
            });
        }

        let target = ProxyTarget::construct(args, mode, &self.devices, &self.control)?;
        guard.insert(name.to_string(), Arc::new(target));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<ProxyTarget>> {
        let guard = self.acquire_lock()?;
        guard.get(name).cloned().ok_or(Error::TargetNotFound {
            name: name.to_string(),
        })
    }

    /// Removes the target. Its control endpoint and device handle are torn
    /// down as soon as the last in-flight request handler drops its
    /// reference - no new handlers can be reached through the table after
    /// this returns.
    #[instrument(name = "target::remove", level = "info", skip(self))]
    pub fn remove(&self, name: &str) -> Result<()> {
        let removed = {
            let mut guard = self.acquire_lock()?;
            guard.remove(name).ok_or(Error::TargetNotFound {
                name: name.to_string(),
            })?
        };

        drop(removed);
        event!(Level::INFO, name, "proxy target removed");
        Ok(())
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn control(&self) -> &ControlRegistry {
        &self.control
    }
}
