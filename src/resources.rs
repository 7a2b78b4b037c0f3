//! Device resources held while a session is live
//!
//! Location watch, wake lock and fullscreen are acquired when the session goes
//! active and released when it finishes. [`ResourceScope`] releases on drop, so
//! a session that is dropped mid-run (panic, cancelled task) still lets go.

use crate::error::Result;

/// A device capability scoped to the live part of a session
pub trait DeviceResource: Send {
    fn name(&self) -> &str;
    fn acquire(&mut self) -> Result<()>;
    fn release(&mut self);
}

/// Resources successfully acquired for one session
pub struct ResourceScope {
    held: Vec<Box<dyn DeviceResource>>,
}

impl ResourceScope {
    /// Acquire every resource. Failures are logged and skipped: a missing
    /// location permission degrades the run, it does not abort it.
    pub fn acquire_all(resources: Vec<Box<dyn DeviceResource>>) -> Self {
        let mut held = Vec::with_capacity(resources.len());
        for mut resource in resources {
            match resource.acquire() {
                Ok(()) => {
                    tracing::debug!(resource = resource.name(), "Resource acquired");
                    held.push(resource);
                }
                Err(e) => {
                    tracing::warn!(resource = resource.name(), error = %e, "Resource unavailable");
                }
            }
        }
        Self { held }
    }

    pub fn held(&self) -> Vec<&str> {
        self.held.iter().map(|r| r.name()).collect()
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        while let Some(mut resource) = self.held.pop() {
            resource.release();
            tracing::debug!(resource = resource.name(), "Resource released");
        }
    }
}

impl std::fmt::Debug for ResourceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceScope")
            .field("held", &self.held())
            .finish()
    }
}
