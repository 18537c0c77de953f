//! Fault injection for exercising the conformance cases.
//!
//! [`FaultyHw`] wraps a real server and misbehaves on demand, so a harness can
//! check that its negative cases actually catch a broken implementation.
//!
//! ```rust
//! use std::sync::Arc;
//! use soundtrigger_default::{DefaultHwConfig, DefaultSoundTriggerHw, Fault, FaultyHw};
//!
//! let inner = Arc::new(DefaultSoundTriggerHw::new(DefaultHwConfig::default()).unwrap());
//! let hw = FaultyHw::new(inner).unwrap();
//! hw.set_fault(Fault::AcceptAll);
//! assert_eq!(hw.fault(), Fault::AcceptAll);
//! ```

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use soundtrigger_hal::status::{self, Status};
use soundtrigger_hal::{
    CallbackCookie, Return, SoundModelHandle, SoundTriggerHw, SoundTriggerHwCallback,
    SoundTriggerHwCallbackV2_1, SoundTriggerHwV2_1, TransportError, v2_0, v2_1,
};
use tracing::{debug, warn};

use crate::dispatch::CallbackDispatcher;

/// How the wrapper misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fault {
    /// Forward every call unchanged.
    Pass = 0,
    /// Fail every call at the transport level.
    DeadObject = 1,
    /// Report success for every load and start without validating anything.
    AcceptAll = 2,
    /// Forward, then fire an unsolicited event at the callback that came
    /// with the call, [`FaultyHw::SPURIOUS_DELAY`] after the call returns.
    SpuriousCallback = 3,
}

impl Fault {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => Fault::DeadObject,
            2 => Fault::AcceptAll,
            3 => Fault::SpuriousCallback,
            _ => Fault::Pass,
        }
    }
}

/// First handle reported in [`Fault::AcceptAll`] mode.
const FAKE_HANDLE_BASE: SoundModelHandle = 1000;

pub struct FaultyHw {
    inner: Arc<dyn SoundTriggerHwV2_1>,
    fault: AtomicU8,
    /// Calls received, whatever the fault mode.
    calls: AtomicU64,
    next_fake_handle: AtomicI32,
    dispatcher: CallbackDispatcher,
}

impl FaultyHw {
    /// How long after the call a spurious event is delivered.
    pub const SPURIOUS_DELAY: Duration = Duration::from_millis(20);

    /// Wrap `inner` with faults disabled.
    pub fn new(inner: Arc<dyn SoundTriggerHwV2_1>) -> io::Result<Self> {
        Ok(Self {
            inner,
            fault: AtomicU8::new(Fault::Pass as u8),
            calls: AtomicU64::new(0),
            next_fake_handle: AtomicI32::new(FAKE_HANDLE_BASE),
            dispatcher: CallbackDispatcher::spawn()?,
        })
    }

    pub fn set_fault(&self, fault: Fault) {
        self.fault.store(fault as u8, Ordering::Relaxed);
    }

    pub fn fault(&self) -> Fault {
        Fault::from_u8(self.fault.load(Ordering::Relaxed))
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Count the call and fail it if the transport is "dead".
    fn check(&self, method: &'static str) -> Result<Fault, TransportError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let fault = self.fault();
        if fault != Fault::Pass {
            debug!(method, ?fault, "injecting fault");
        }
        match fault {
            Fault::DeadObject => Err(TransportError::DeadObject),
            other => Ok(other),
        }
    }

    fn fake_load(&self) -> (Status, SoundModelHandle) {
        let handle = self.next_fake_handle.fetch_add(1, Ordering::Relaxed);
        (status::OK, handle)
    }

    /// Queue an unsolicited event on the callback thread.
    fn spurious(&self, job: impl FnOnce() -> Return<()> + Send + 'static) {
        let queued = self.dispatcher.deliver(move || {
            std::thread::sleep(Self::SPURIOUS_DELAY);
            if let Err(e) = job() {
                warn!(error = %e, "spurious callback failed");
            }
        });
        if !queued {
            warn!("callback dispatcher is gone, spurious event dropped");
        }
    }
}

fn spurious_model_event(handle: SoundModelHandle) -> v2_0::ModelEvent {
    v2_0::ModelEvent {
        status: v2_0::SoundModelStatus::Updated,
        model: handle,
        data: Vec::new(),
    }
}

fn spurious_recognition(handle: SoundModelHandle) -> v2_0::RecognitionEvent {
    v2_0::RecognitionEvent {
        status: v2_0::RecognitionStatus::Failure,
        model: handle,
        ..Default::default()
    }
}

impl SoundTriggerHw for FaultyHw {
    fn get_properties(&self) -> Return<(Status, v2_0::Properties)> {
        self.check("getProperties")?;
        self.inner.get_properties()
    }

    fn load_sound_model(
        &self,
        model: &v2_0::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        match self.check("loadSoundModel")? {
            Fault::AcceptAll => Ok(self.fake_load()),
            Fault::SpuriousCallback => {
                let result = self.inner.load_sound_model(model, callback.clone(), cookie)?;
                let event = spurious_model_event(result.1);
                self.spurious(move || callback.sound_model_callback(&event, cookie));
                Ok(result)
            }
            _ => self.inner.load_sound_model(model, callback, cookie),
        }
    }

    fn load_phrase_sound_model(
        &self,
        model: &v2_0::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        match self.check("loadPhraseSoundModel")? {
            Fault::AcceptAll => Ok(self.fake_load()),
            Fault::SpuriousCallback => {
                let result = self.inner.load_phrase_sound_model(model, callback.clone(), cookie)?;
                let event = spurious_model_event(result.1);
                self.spurious(move || callback.sound_model_callback(&event, cookie));
                Ok(result)
            }
            _ => self.inner.load_phrase_sound_model(model, callback, cookie),
        }
    }

    fn unload_sound_model(&self, model_handle: SoundModelHandle) -> Return<Status> {
        match self.check("unloadSoundModel")? {
            Fault::AcceptAll => Ok(status::OK),
            _ => self.inner.unload_sound_model(model_handle),
        }
    }

    fn start_recognition(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_0::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<Status> {
        match self.check("startRecognition")? {
            Fault::AcceptAll => Ok(status::OK),
            Fault::SpuriousCallback => {
                let status = self.inner.start_recognition(
                    model_handle,
                    config,
                    callback.clone(),
                    cookie,
                )?;
                let event = spurious_recognition(model_handle);
                self.spurious(move || callback.recognition_callback(&event, cookie));
                Ok(status)
            }
            _ => self.inner.start_recognition(model_handle, config, callback, cookie),
        }
    }

    fn stop_recognition(&self, model_handle: SoundModelHandle) -> Return<Status> {
        match self.check("stopRecognition")? {
            Fault::AcceptAll => Ok(status::OK),
            _ => self.inner.stop_recognition(model_handle),
        }
    }

    fn stop_all_recognitions(&self) -> Return<Status> {
        self.check("stopAllRecognitions")?;
        self.inner.stop_all_recognitions()
    }
}

impl SoundTriggerHwV2_1 for FaultyHw {
    fn load_sound_model_2_1(
        &self,
        model: &v2_1::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        match self.check("loadSoundModel_2_1")? {
            Fault::AcceptAll => Ok(self.fake_load()),
            Fault::SpuriousCallback => {
                let result = self.inner.load_sound_model_2_1(model, callback.clone(), cookie)?;
                let event = v2_1::ModelEvent {
                    header: spurious_model_event(result.1),
                    data: Default::default(),
                };
                self.spurious(move || callback.sound_model_callback_2_1(&event, cookie));
                Ok(result)
            }
            _ => self.inner.load_sound_model_2_1(model, callback, cookie),
        }
    }

    fn load_phrase_sound_model_2_1(
        &self,
        model: &v2_1::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        match self.check("loadPhraseSoundModel_2_1")? {
            Fault::AcceptAll => Ok(self.fake_load()),
            Fault::SpuriousCallback => {
                let result = self.inner.load_phrase_sound_model_2_1(
                    model,
                    callback.clone(),
                    cookie,
                )?;
                let event = v2_1::ModelEvent {
                    header: spurious_model_event(result.1),
                    data: Default::default(),
                };
                self.spurious(move || callback.sound_model_callback_2_1(&event, cookie));
                Ok(result)
            }
            _ => self.inner.load_phrase_sound_model_2_1(model, callback, cookie),
        }
    }

    fn start_recognition_2_1(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_1::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<Status> {
        match self.check("startRecognition_2_1")? {
            Fault::AcceptAll => Ok(status::OK),
            Fault::SpuriousCallback => {
                let status = self.inner.start_recognition_2_1(
                    model_handle,
                    config,
                    callback.clone(),
                    cookie,
                )?;
                let event = v2_1::RecognitionEvent {
                    header: spurious_recognition(model_handle),
                    data: Default::default(),
                };
                self.spurious(move || callback.recognition_callback_2_1(&event, cookie));
                Ok(status)
            }
            _ => self.inner.start_recognition_2_1(model_handle, config, callback, cookie),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultHwConfig, DefaultSoundTriggerHw};
    use parking_lot::Mutex;

    /// Records the name of the thread each event arrived on.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<Option<String>>>);

    impl Recorder {
        fn tick(&self) -> Return<()> {
            let thread = std::thread::current().name().map(str::to_owned);
            self.0.lock().push(thread);
            Ok(())
        }
    }

    impl SoundTriggerHwCallback for Recorder {
        fn recognition_callback(
            &self,
            _: &v2_0::RecognitionEvent,
            _: CallbackCookie,
        ) -> Return<()> {
            self.tick()
        }

        fn phrase_recognition_callback(
            &self,
            _: &v2_0::PhraseRecognitionEvent,
            _: CallbackCookie,
        ) -> Return<()> {
            self.tick()
        }

        fn sound_model_callback(&self, _: &v2_0::ModelEvent, _: CallbackCookie) -> Return<()> {
            self.tick()
        }
    }

    impl SoundTriggerHwCallbackV2_1 for Recorder {
        fn recognition_callback_2_1(
            &self,
            _: &v2_1::RecognitionEvent,
            _: CallbackCookie,
        ) -> Return<()> {
            self.tick()
        }

        fn phrase_recognition_callback_2_1(
            &self,
            _: &v2_1::PhraseRecognitionEvent,
            _: CallbackCookie,
        ) -> Return<()> {
            self.tick()
        }

        fn sound_model_callback_2_1(&self, _: &v2_1::ModelEvent, _: CallbackCookie) -> Return<()> {
            self.tick()
        }
    }

    fn faulty() -> FaultyHw {
        let inner = DefaultSoundTriggerHw::new(DefaultHwConfig::default()).unwrap();
        FaultyHw::new(Arc::new(inner)).unwrap()
    }

    #[test]
    fn pass_forwards() {
        let hw = faulty();
        let cb = Arc::new(Recorder::default());
        let (status, _) = hw.load_sound_model(&v2_0::SoundModel::default(), cb, 0).unwrap();
        assert_eq!(status, status::BAD_VALUE);
        assert_eq!(hw.calls(), 1);
    }

    #[test]
    fn dead_object_fails_transport() {
        let hw = faulty();
        hw.set_fault(Fault::DeadObject);
        assert_eq!(hw.get_properties().unwrap_err(), TransportError::DeadObject);
        assert_eq!(hw.stop_all_recognitions().unwrap_err(), TransportError::DeadObject);
        assert_eq!(hw.calls(), 2);
    }

    #[test]
    fn accept_all_skips_validation() {
        let hw = faulty();
        hw.set_fault(Fault::AcceptAll);
        let cb = Arc::new(Recorder::default());

        let (status, handle) = hw
            .load_sound_model_2_1(&v2_1::SoundModel::default(), cb.clone(), 0)
            .unwrap();
        assert_eq!(status, status::OK);
        assert_eq!(handle, FAKE_HANDLE_BASE);

        let status = hw
            .start_recognition_2_1(0, &v2_1::RecognitionConfig::default(), cb, 0)
            .unwrap();
        assert_eq!(status, status::OK);
    }

    #[test]
    fn spurious_callbacks_arrive_on_the_callback_thread() {
        let hw = faulty();
        hw.set_fault(Fault::SpuriousCallback);
        let cb = Arc::new(Recorder::default());

        let (status, _) = hw
            .load_sound_model_2_1(&v2_1::SoundModel::default(), cb.clone(), 0)
            .unwrap();
        assert_ne!(status, status::OK);
        let status = hw
            .start_recognition_2_1(0, &v2_1::RecognitionConfig::default(), cb.clone(), 0)
            .unwrap();
        assert_ne!(status, status::OK);

        // Dropping the wrapper drains the callback queue.
        drop(hw);
        let threads = cb.0.lock().clone();
        assert_eq!(threads, vec![Some("soundtrigger-callbacks".to_owned()); 2]);
    }
}
