//! Sound Trigger HAL contracts, versions 2.0 and 2.1.
//!
//! A Sound Trigger HAL drives an always-on keyword/sound detection engine. A
//! client loads a vendor sound model, starts recognition on it, and receives
//! asynchronous events through a callback object it passed in with the call.
//!
//! # Versions
//!
//! 2.1 extends 2.0. Every 2.1 server also serves the 2.0 operations, and every
//! 2.1 callback also accepts the 2.0 events. This is expressed as supertraits:
//!
//! - [`SoundTriggerHwV2_1`]: [`SoundTriggerHw`]
//! - [`SoundTriggerHwCallbackV2_1`]: [`SoundTriggerHwCallback`]
//!
//! # Results
//!
//! Every operation returns a [`Return`]. `Err` means the call did not complete
//! (a [`TransportError`]); `Ok` carries the server's [`Status`] (0 on success,
//! a negated errno otherwise) plus any out-parameters.

use std::sync::Arc;

use hal_service_manager::{HalInterface, RegistryError, ServiceManager};

pub mod audio;
pub mod status;
pub mod v2_0;
pub mod v2_1;

pub use hal_service_manager::{Return, TransportError};
pub use status::Status;
pub use v2_0::{CallbackCookie, SoundModelHandle};

/// Sound Trigger HAL server, version 2.0.
pub trait SoundTriggerHw: Send + Sync {
    /// Implementation properties.
    fn get_properties(&self) -> Return<(Status, v2_0::Properties)>;

    /// Load a generic sound model. Events for the model go to `callback`.
    fn load_sound_model(
        &self,
        model: &v2_0::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)>;

    /// Load a key phrase sound model.
    fn load_phrase_sound_model(
        &self,
        model: &v2_0::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)>;

    /// Unload a model, stopping any active recognition on it.
    fn unload_sound_model(&self, model_handle: SoundModelHandle) -> Return<Status>;

    /// Start recognition on a loaded model.
    fn start_recognition(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_0::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<Status>;

    /// Stop recognition on a model.
    fn stop_recognition(&self, model_handle: SoundModelHandle) -> Return<Status>;

    /// Stop recognition on every model.
    fn stop_all_recognitions(&self) -> Return<Status>;
}

/// Sound Trigger HAL server, version 2.1.
pub trait SoundTriggerHwV2_1: SoundTriggerHw {
    /// Load a generic sound model whose payload is in shared memory.
    fn load_sound_model_2_1(
        &self,
        model: &v2_1::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)>;

    /// Load a key phrase sound model whose payload is in shared memory.
    fn load_phrase_sound_model_2_1(
        &self,
        model: &v2_1::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)>;

    /// Start recognition with vendor data in shared memory.
    fn start_recognition_2_1(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_1::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<Status>;
}

/// Client callback, version 2.0.
///
/// Called by the server, possibly from a thread the client does not own.
pub trait SoundTriggerHwCallback: Send + Sync {
    fn recognition_callback(
        &self,
        event: &v2_0::RecognitionEvent,
        cookie: CallbackCookie,
    ) -> Return<()>;

    fn phrase_recognition_callback(
        &self,
        event: &v2_0::PhraseRecognitionEvent,
        cookie: CallbackCookie,
    ) -> Return<()>;

    fn sound_model_callback(&self, event: &v2_0::ModelEvent, cookie: CallbackCookie)
    -> Return<()>;
}

/// Client callback, version 2.1.
pub trait SoundTriggerHwCallbackV2_1: SoundTriggerHwCallback {
    fn recognition_callback_2_1(
        &self,
        event: &v2_1::RecognitionEvent,
        cookie: CallbackCookie,
    ) -> Return<()>;

    fn phrase_recognition_callback_2_1(
        &self,
        event: &v2_1::PhraseRecognitionEvent,
        cookie: CallbackCookie,
    ) -> Return<()>;

    fn sound_model_callback_2_1(
        &self,
        event: &v2_1::ModelEvent,
        cookie: CallbackCookie,
    ) -> Return<()>;
}

impl HalInterface for dyn SoundTriggerHw {
    const DESCRIPTOR: &'static str = "android.hardware.soundtrigger@2.0::ISoundTriggerHw";
}

impl HalInterface for dyn SoundTriggerHwV2_1 {
    const DESCRIPTOR: &'static str = "android.hardware.soundtrigger@2.1::ISoundTriggerHw";
}

/// Register a 2.1 server under both the 2.1 and the 2.0 descriptor, so that
/// clients of either version can discover it.
pub fn register_sound_trigger_hw(
    manager: &ServiceManager,
    instance: &str,
    hal: Arc<dyn SoundTriggerHwV2_1>,
) -> Result<(), RegistryError> {
    manager.add_service::<dyn SoundTriggerHwV2_1>(instance, hal.clone())?;

    let base: Arc<dyn SoundTriggerHw> = hal;
    if let Err(e) = manager.add_service::<dyn SoundTriggerHw>(instance, base) {
        manager.remove_service(<dyn SoundTriggerHwV2_1>::DESCRIPTOR, instance);
        return Err(e);
    }
    Ok(())
}
