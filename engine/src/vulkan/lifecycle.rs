use log::*;

use super::error::LifecycleError;

struct TrackedResource {
    label: String,
    destroy: Box<dyn FnOnce()>,
}

/// Records native handles in creation order and destroys them in reverse.
///
/// Handles are registered right after they are created, so a handle is always
/// registered after everything it was created from. Dropping the lifecycle
/// without calling [`ResourceLifecycle::teardown_all`] tears everything down,
/// which is what releases a partially built set when initialization bails out
/// half way.
#[derive(Default)]
pub struct ResourceLifecycle {
    resources: Vec<TrackedResource>,
    torn_down: bool,
}

impl ResourceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `destroy` to run for `label` during teardown.
    ///
    /// Conditionally created handles (the diagnostic messenger) are simply
    /// never registered when they were not created. Tracking after teardown
    /// destroys the handle on the spot and reports the misuse.
    pub fn track<F>(&mut self, label: impl Into<String>, destroy: F) -> Result<(), LifecycleError>
    where
        F: FnOnce() + 'static,
    {
        if self.torn_down {
            destroy();
            return Err(LifecycleError::AlreadyTornDown);
        }

        let label = label.into();
        trace!("Tracking `{}`.", label);
        self.resources.push(TrackedResource {
            label,
            destroy: Box::new(destroy),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Labels of the live resources, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.label.as_str())
    }

    /// Destroys every tracked resource, newest first. One shot: a second call
    /// is rejected instead of destroying anything twice.
    pub fn teardown_all(&mut self) -> Result<(), LifecycleError> {
        if self.torn_down {
            return Err(LifecycleError::AlreadyTornDown);
        }
        self.torn_down = true;

        while let Some(resource) = self.resources.pop() {
            debug!("Destroying `{}`.", resource.label);
            (resource.destroy)();
        }

        Ok(())
    }
}

impl std::fmt::Debug for ResourceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLifecycle")
            .field("resources", &self.labels().collect::<Vec<_>>())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl Drop for ResourceLifecycle {
    fn drop(&mut self) {
        if !self.torn_down && !self.resources.is_empty() {
            warn!(
                "Releasing {} resources that were never explicitly torn down.",
                self.resources.len()
            );
            let _ = self.teardown_all();
        }
    }
}
