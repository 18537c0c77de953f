//! Per-instance fixture: a bound HAL client, its callback sink and monitor.

use std::sync::Arc;

use hal_service_manager::ServiceManager;
use hidl_memory::Allocator;
use parking_lot::Mutex;
use soundtrigger_hal::{SoundTriggerHwV2_1, v2_0, v2_1};
use tracing::debug;

use crate::callback::CallbackSink;
use crate::config::SuiteConfig;
use crate::monitor::Monitor;
use crate::rng::SuiteRng;

/// Why a fixture, or a resource a case needs, could not be set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// No 2.1 server is registered under the instance name.
    NoHal { instance: String },
    /// The shared memory allocator service is not registered.
    NoAllocator { instance: String },
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::NoHal { instance } => {
                write!(f, "no sound trigger 2.1 service for instance '{}'", instance)
            }
            SetupError::NoAllocator { instance } => {
                write!(f, "no memory allocator service '{}'", instance)
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// State the callback sink writes and the test thread reads.
#[derive(Debug, Default)]
pub struct FixtureState {
    monitor: Monitor,
    last_model_event_2_0: Mutex<Option<v2_0::ModelEvent>>,
    last_model_event: Mutex<Option<v2_1::ModelEvent>>,
}

impl FixtureState {
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn last_model_event_2_0(&self) -> Option<v2_0::ModelEvent> {
        self.last_model_event_2_0.lock().clone()
    }

    pub fn last_model_event(&self) -> Option<v2_1::ModelEvent> {
        self.last_model_event.lock().clone()
    }

    // Slot is written before the monitor is notified.
    pub(crate) fn record_model_event_2_0(&self, event: v2_0::ModelEvent) {
        *self.last_model_event_2_0.lock() = Some(event);
        self.monitor.notify();
    }

    pub(crate) fn record_model_event(&self, event: v2_1::ModelEvent) {
        *self.last_model_event.lock() = Some(event);
        self.monitor.notify();
    }
}

/// Everything one case needs to probe one HAL instance.
///
/// Fields drop in declaration order, which is the reverse of set-up order.
pub struct Fixture<'m> {
    callback: Arc<CallbackSink>,
    state: Arc<FixtureState>,
    hal: Arc<dyn SoundTriggerHwV2_1>,
    instance: String,
    manager: &'m ServiceManager,
    config: SuiteConfig,
    rng: SuiteRng,
}

impl<'m> Fixture<'m> {
    /// Bind the HAL for `instance` and build a fresh sink. The first set-up
    /// of a suite seeds `rng`.
    pub fn set_up(
        manager: &'m ServiceManager,
        instance: &str,
        config: &SuiteConfig,
        rng: &SuiteRng,
    ) -> Result<Self, SetupError> {
        let hal = manager
            .get_service::<dyn SoundTriggerHwV2_1>(instance)
            .ok_or_else(|| SetupError::NoHal {
                instance: instance.to_owned(),
            })?;

        if rng.seed_once(config.rng_seed) {
            debug!(instance, "first fixture of the suite");
        }

        let state = Arc::new(FixtureState::default());
        let callback = CallbackSink::new(&state);

        debug!(instance, "fixture set up");
        Ok(Self {
            callback,
            state,
            hal,
            instance: instance.to_owned(),
            manager,
            config: config.clone(),
            rng: rng.clone(),
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn hal(&self) -> &Arc<dyn SoundTriggerHwV2_1> {
        &self.hal
    }

    /// The sink, ready to pass to a HAL call.
    pub fn callback(&self) -> Arc<CallbackSink> {
        self.callback.clone()
    }

    pub fn monitor(&self) -> &Monitor {
        self.state.monitor()
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn rng(&self) -> &SuiteRng {
        &self.rng
    }

    /// Resolve the shared memory allocator service.
    pub fn allocator(&self) -> Result<Arc<dyn Allocator>, SetupError> {
        let instance = &self.config.allocator_instance;
        self.manager
            .get_service::<dyn Allocator>(instance)
            .ok_or_else(|| SetupError::NoAllocator {
                instance: instance.clone(),
            })
    }
}

impl Drop for Fixture<'_> {
    fn drop(&mut self) {
        debug!(instance = %self.instance, "fixture torn down");
    }
}
