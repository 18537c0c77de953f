//! Registry of named HAL service instances.
//!
//! A HAL interface is identified by a fully-qualified descriptor such as
//! `android.hardware.soundtrigger@2.1::ISoundTriggerHw`. Each interface can have
//! several registered servers on one device, told apart by an instance name
//! (`"default"`, `"vendor-dsp"`, ...).
//!
//! The manager stores one typed `Arc<I>` per (descriptor, instance) pair, where
//! `I` is usually a trait object like `dyn ISoundTriggerHw`. Interface types
//! opt in by implementing [`HalInterface`], which ties the Rust type to its
//! descriptor string.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hal_service_manager::{HalInterface, ServiceManager};
//!
//! trait Echo: Send + Sync {
//!     fn echo(&self, value: u32) -> u32;
//! }
//!
//! impl HalInterface for dyn Echo {
//!     const DESCRIPTOR: &'static str = "com.example.echo@1.0::IEcho";
//! }
//!
//! struct EchoImpl;
//!
//! impl Echo for EchoImpl {
//!     fn echo(&self, value: u32) -> u32 {
//!         value
//!     }
//! }
//!
//! let manager = ServiceManager::new();
//! manager.add_service::<dyn Echo>("default", Arc::new(EchoImpl)).unwrap();
//!
//! assert_eq!(manager.list_instances(<dyn Echo>::DESCRIPTOR), vec!["default"]);
//! let echo = manager.get_service::<dyn Echo>("default").unwrap();
//! assert_eq!(echo.echo(7), 7);
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

mod transport;

pub use transport::{Return, TransportError};

/// Maximum instance name length.
pub const MAX_INSTANCE_NAME_LEN: usize = 256;

/// Maximum descriptor length.
pub const MAX_DESCRIPTOR_LEN: usize = 256;

/// A type that can be registered with and resolved from a [`ServiceManager`].
pub trait HalInterface: Send + Sync + 'static {
    /// Fully-qualified interface descriptor, e.g. `pkg@1.0::IFoo`.
    const DESCRIPTOR: &'static str;
}

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Instance name is empty
    EmptyInstanceName,
    /// Instance name exceeds MAX_INSTANCE_NAME_LEN
    InstanceNameTooLong,
    /// Instance name contains control characters
    UnprintableInstanceName,
    /// Descriptor is empty or exceeds MAX_DESCRIPTOR_LEN
    InvalidDescriptor,
    /// An instance with this name is already registered for the descriptor
    DuplicateInstance {
        descriptor: &'static str,
        instance: String,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::EmptyInstanceName => write!(f, "instance name cannot be empty"),
            RegistryError::InstanceNameTooLong => {
                write!(f, "instance name exceeds {} bytes", MAX_INSTANCE_NAME_LEN)
            }
            RegistryError::UnprintableInstanceName => {
                write!(f, "instance name contains control characters")
            }
            RegistryError::InvalidDescriptor => write!(f, "invalid interface descriptor"),
            RegistryError::DuplicateInstance {
                descriptor,
                instance,
            } => write!(f, "{}/{} is already registered", descriptor, instance),
        }
    }
}

impl std::error::Error for RegistryError {}

/// One registered server. The box holds an `Arc<I>` for the interface type
/// the entry was registered under.
struct ServiceEntry {
    service: Box<dyn Any + Send + Sync>,
}

/// Registry of HAL servers keyed by descriptor, then instance name.
#[derive(Default)]
pub struct ServiceManager {
    services: RwLock<BTreeMap<&'static str, BTreeMap<String, ServiceEntry>>>,
}

static_assertions::assert_impl_all!(ServiceManager: Send, Sync);

impl ServiceManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide manager.
    pub fn global() -> &'static ServiceManager {
        static GLOBAL: OnceLock<ServiceManager> = OnceLock::new();
        GLOBAL.get_or_init(ServiceManager::new)
    }

    /// Register `service` as `instance` of interface `I`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the instance name is empty, too long, or contains control characters
    /// - the descriptor of `I` is malformed
    /// - the instance is already registered for this descriptor
    pub fn add_service<I>(&self, instance: &str, service: Arc<I>) -> Result<(), RegistryError>
    where
        I: HalInterface + ?Sized,
    {
        validate_descriptor(I::DESCRIPTOR)?;
        validate_instance_name(instance)?;

        let mut services = self.services.write();
        let instances = services.entry(I::DESCRIPTOR).or_default();
        if instances.contains_key(instance) {
            return Err(RegistryError::DuplicateInstance {
                descriptor: I::DESCRIPTOR,
                instance: instance.to_owned(),
            });
        }

        instances.insert(
            instance.to_owned(),
            ServiceEntry {
                service: Box::new(service),
            },
        );
        debug!(descriptor = I::DESCRIPTOR, instance, "registered service");
        Ok(())
    }

    /// Resolve the server registered as `instance` of interface `I`.
    pub fn get_service<I>(&self, instance: &str) -> Option<Arc<I>>
    where
        I: HalInterface + ?Sized,
    {
        let services = self.services.read();
        let entry = services.get(I::DESCRIPTOR)?.get(instance)?;
        let service = entry.service.downcast_ref::<Arc<I>>().cloned();
        if service.is_none() {
            debug!(
                descriptor = I::DESCRIPTOR,
                instance, "registered service has a different interface type"
            );
        }
        service
    }

    /// All instance names registered for `descriptor`, in sorted order.
    pub fn list_instances(&self, descriptor: &str) -> Vec<String> {
        self.services
            .read()
            .get(descriptor)
            .map(|instances| instances.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a registration. Returns true if something was removed.
    pub fn remove_service(&self, descriptor: &str, instance: &str) -> bool {
        let mut services = self.services.write();
        let Some(instances) = services.get_mut(descriptor) else {
            return false;
        };
        let removed = instances.remove(instance).is_some();
        if removed {
            debug!(descriptor, instance, "removed service");
        }
        removed
    }
}

fn validate_descriptor(descriptor: &str) -> Result<(), RegistryError> {
    if descriptor.is_empty() || descriptor.len() > MAX_DESCRIPTOR_LEN {
        return Err(RegistryError::InvalidDescriptor);
    }
    Ok(())
}

fn validate_instance_name(instance: &str) -> Result<(), RegistryError> {
    if instance.is_empty() {
        return Err(RegistryError::EmptyInstanceName);
    }
    if instance.len() > MAX_INSTANCE_NAME_LEN {
        return Err(RegistryError::InstanceNameTooLong);
    }
    if instance.chars().any(char::is_control) {
        return Err(RegistryError::UnprintableInstanceName);
    }
    Ok(())
}
