//! Explicit environment passed to every model constructor.

use std::rc::Rc;
use std::sync::Arc;

use crate::application::options::CoreOptions;
use crate::domain::ports::{Cabinet, ClientPort};
use crate::runtime::Scheduler;

/// Everything a model needs to operate: the offline cache, the async
/// client, configuration, and the owner-thread scheduler. Passed explicitly
/// to every component constructor; there is no global state.
///
/// Cloning is cheap: the cabinet and client are shared by `Arc`, the
/// scheduler by `Rc` (it never leaves the owner thread).
#[derive(Clone)]
pub struct ModelEnv {
    cabinet: Arc<dyn Cabinet>,
    client: Arc<dyn ClientPort>,
    scheduler: Rc<Scheduler>,
    options: CoreOptions,
}

impl ModelEnv {
    /// Creates a new environment.
    #[must_use]
    pub fn new(
        cabinet: Arc<dyn Cabinet>,
        client: Arc<dyn ClientPort>,
        scheduler: Rc<Scheduler>,
        options: CoreOptions,
    ) -> Self {
        Self {
            cabinet,
            client,
            scheduler,
            options,
        }
    }

    /// Returns the offline cache.
    #[must_use]
    pub fn cabinet(&self) -> &Arc<dyn Cabinet> {
        &self.cabinet
    }

    /// Returns the async client.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn ClientPort> {
        &self.client
    }

    /// Returns the owner-thread scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn options(&self) -> &CoreOptions {
        &self.options
    }
}

impl std::fmt::Debug for ModelEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEnv")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
