//! Reference in-process Sound Trigger HAL 2.1 server.
//!
//! [`DefaultSoundTriggerHw`] implements the full 2.0 and 2.1 surface with
//! real validation: only payloads in the [`payload`] framing load, handles are
//! positive, and recognition requires a loaded model and an input device.
//! It can also originate events ([`DefaultSoundTriggerHw::update_model`],
//! [`DefaultSoundTriggerHw::trigger_recognition`]), delivered on a dedicated
//! callback thread.
//!
//! [`FaultyHw`] wraps any server and misbehaves on demand.

use std::io;
use std::sync::Arc;

use hal_service_manager::{RegistryError, ServiceManager};
use hidl_memory::{ASHMEM_INSTANCE, Allocator, AshmemAllocator};

mod config;
mod dispatch;
mod fault;
mod hw;
pub mod payload;

pub use config::DefaultHwConfig;
pub use fault::{Fault, FaultyHw};
pub use hw::DefaultSoundTriggerHw;

/// Instance name the reference server registers under.
pub const DEFAULT_INSTANCE: &str = "default";

static_assertions::assert_impl_all!(DefaultSoundTriggerHw: Send, Sync);
static_assertions::assert_impl_all!(FaultyHw: Send, Sync);

/// Why the reference services could not be brought up.
#[derive(Debug)]
pub enum ServeError {
    /// The callback thread could not be started.
    Io(io::Error),
    Registry(RegistryError),
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Io(e) => write!(f, "failed to start sound trigger server: {}", e),
            ServeError::Registry(e) => write!(f, "failed to register services: {}", e),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServeError::Io(e) => Some(e),
            ServeError::Registry(e) => Some(e),
        }
    }
}

impl From<io::Error> for ServeError {
    fn from(e: io::Error) -> Self {
        ServeError::Io(e)
    }
}

impl From<RegistryError> for ServeError {
    fn from(e: RegistryError) -> Self {
        ServeError::Registry(e)
    }
}

/// Start a reference server and register it as [`DEFAULT_INSTANCE`], along
/// with the ashmem allocator the 2.1 operations need.
pub fn serve_default(
    manager: &ServiceManager,
    config: DefaultHwConfig,
) -> Result<Arc<DefaultSoundTriggerHw>, ServeError> {
    let hw = Arc::new(DefaultSoundTriggerHw::new(config)?);
    soundtrigger_hal::register_sound_trigger_hw(manager, DEFAULT_INSTANCE, hw.clone())?;

    let allocator: Arc<dyn Allocator> = Arc::new(AshmemAllocator::new());
    if manager
        .get_service::<dyn Allocator>(ASHMEM_INSTANCE)
        .is_none()
    {
        manager.add_service::<dyn Allocator>(ASHMEM_INSTANCE, allocator)?;
    }

    tracing::info!(instance = DEFAULT_INSTANCE, "reference sound trigger server registered");
    Ok(hw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundtrigger_hal::{SoundTriggerHw, SoundTriggerHwV2_1};

    #[test]
    fn serve_default_registers_both_versions_and_allocator() {
        let manager = ServiceManager::new();
        serve_default(&manager, DefaultHwConfig::default()).unwrap();

        assert!(
            manager
                .get_service::<dyn SoundTriggerHwV2_1>(DEFAULT_INSTANCE)
                .is_some()
        );
        assert!(
            manager
                .get_service::<dyn SoundTriggerHw>(DEFAULT_INSTANCE)
                .is_some()
        );
        assert!(manager.get_service::<dyn Allocator>(ASHMEM_INSTANCE).is_some());
    }

    #[test]
    fn serving_twice_is_a_duplicate() {
        let manager = ServiceManager::new();
        serve_default(&manager, DefaultHwConfig::default()).unwrap();
        let err = serve_default(&manager, DefaultHwConfig::default()).unwrap_err();
        assert!(matches!(err, ServeError::Registry(RegistryError::DuplicateInstance { .. })));
    }
}
