//! The reference server.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use hidl_memory::{AshmemAllocator, HidlMemory, MappedMemory};
use parking_lot::Mutex;
use soundtrigger_hal::status::{self, Status};
use soundtrigger_hal::v2_0::{self, SoundModelType};
use soundtrigger_hal::{
    CallbackCookie, Return, SoundModelHandle, SoundTriggerHw, SoundTriggerHwCallback,
    SoundTriggerHwCallbackV2_1, SoundTriggerHwV2_1, v2_1,
};
use tracing::{debug, info, warn};

use crate::config::DefaultHwConfig;
use crate::dispatch::CallbackDispatcher;
use crate::payload;

/// Where events for a model or a recognition session go.
#[derive(Clone)]
enum Listener {
    V2_0(Arc<dyn SoundTriggerHwCallback>),
    V2_1(Arc<dyn SoundTriggerHwCallbackV2_1>),
}

struct Session {
    listener: Listener,
    cookie: CallbackCookie,
    phrases: Vec<v2_0::PhraseRecognitionExtra>,
}

struct LoadedModel {
    model_type: SoundModelType,
    phrase_ids: Vec<u32>,
    listener: Listener,
    cookie: CallbackCookie,
    session: Option<Session>,
}

struct HwState {
    next_handle: SoundModelHandle,
    models: BTreeMap<SoundModelHandle, LoadedModel>,
}

/// In-process Sound Trigger HAL 2.1 server.
///
/// Accepts only payloads in the [`payload`] framing. Server-initiated events
/// are delivered on a dedicated callback thread.
pub struct DefaultSoundTriggerHw {
    config: DefaultHwConfig,
    state: Mutex<HwState>,
    dispatcher: CallbackDispatcher,
}

impl std::fmt::Debug for DefaultSoundTriggerHw {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultSoundTriggerHw")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DefaultSoundTriggerHw {
    pub fn new(config: DefaultHwConfig) -> io::Result<Self> {
        Ok(Self {
            config,
            state: Mutex::new(HwState {
                next_handle: 1,
                models: BTreeMap::new(),
            }),
            dispatcher: CallbackDispatcher::spawn()?,
        })
    }

    pub fn config(&self) -> &DefaultHwConfig {
        &self.config
    }

    /// Number of models currently loaded.
    pub fn loaded_models(&self) -> usize {
        self.state.lock().models.len()
    }

    /// True if recognition is active on `handle`.
    pub fn is_recognizing(&self, handle: SoundModelHandle) -> bool {
        self.state
            .lock()
            .models
            .get(&handle)
            .is_some_and(|m| m.session.is_some())
    }

    /// Simulate a vendor-side model update, delivering a model event to the
    /// listener the model was loaded with.
    pub fn update_model(&self, handle: SoundModelHandle, data: Vec<u8>) -> Result<(), Status> {
        let (listener, cookie) = {
            let state = self.state.lock();
            let model = state.models.get(&handle).ok_or(status::BAD_VALUE)?;
            (model.listener.clone(), model.cookie)
        };

        let header = v2_0::ModelEvent {
            status: v2_0::SoundModelStatus::Updated,
            model: handle,
            data: Vec::new(),
        };
        match listener {
            Listener::V2_0(callback) => {
                let event = v2_0::ModelEvent { data, ..header };
                self.deliver(move || callback.sound_model_callback(&event, cookie));
            }
            Listener::V2_1(callback) => {
                let event = v2_1::ModelEvent {
                    header,
                    data: share(&data)?,
                };
                self.deliver(move || callback.sound_model_callback_2_1(&event, cookie));
            }
        }
        info!(handle, "model update event queued");
        Ok(())
    }

    /// Simulate a detection on `handle`. Recognition ends once the event is
    /// queued, as it does on real hardware.
    pub fn trigger_recognition(&self, handle: SoundModelHandle) -> Result<(), Status> {
        let (model_type, session) = {
            let mut state = self.state.lock();
            let model = state.models.get_mut(&handle).ok_or(status::BAD_VALUE)?;
            let session = model.session.take().ok_or(status::INVALID_OPERATION)?;
            (model.model_type, session)
        };

        let header = v2_0::RecognitionEvent {
            status: v2_0::RecognitionStatus::Success,
            model_type,
            model: handle,
            ..Default::default()
        };
        let cookie = session.cookie;
        let phrase_extras = session.phrases;
        let is_phrase = model_type == SoundModelType::Keyphrase;

        match session.listener {
            Listener::V2_0(callback) if is_phrase => {
                let event = v2_0::PhraseRecognitionEvent {
                    common: header,
                    phrase_extras,
                };
                self.deliver(move || callback.phrase_recognition_callback(&event, cookie));
            }
            Listener::V2_0(callback) => {
                self.deliver(move || callback.recognition_callback(&header, cookie));
            }
            Listener::V2_1(callback) if is_phrase => {
                let event = v2_1::PhraseRecognitionEvent {
                    common: v2_1::RecognitionEvent {
                        header,
                        data: HidlMemory::default(),
                    },
                    phrase_extras,
                };
                self.deliver(move || callback.phrase_recognition_callback_2_1(&event, cookie));
            }
            Listener::V2_1(callback) => {
                let event = v2_1::RecognitionEvent {
                    header,
                    data: HidlMemory::default(),
                };
                self.deliver(move || callback.recognition_callback_2_1(&event, cookie));
            }
        }
        info!(handle, "recognition event queued");
        Ok(())
    }

    fn deliver(&self, job: impl FnOnce() -> Return<()> + Send + 'static) {
        let queued = self.dispatcher.deliver(move || {
            if let Err(e) = job() {
                warn!(error = %e, "client callback failed");
            }
        });
        if !queued {
            warn!("callback dispatcher is gone, event dropped");
        }
    }

    fn load(
        &self,
        model_type: SoundModelType,
        expected: SoundModelType,
        data: &[u8],
        phrases: &[v2_0::Phrase],
        listener: Listener,
        cookie: CallbackCookie,
    ) -> (Status, SoundModelHandle) {
        if model_type != expected {
            debug!(?model_type, ?expected, "rejecting model of the wrong type");
            return (status::BAD_VALUE, 0);
        }
        if let Err(e) = payload::decode(data) {
            debug!(error = %e, "rejecting model payload");
            return (status::BAD_VALUE, 0);
        }
        if expected == SoundModelType::Keyphrase {
            if phrases.is_empty() {
                debug!("rejecting phrase model without phrases");
                return (status::BAD_VALUE, 0);
            }
            if phrases.len() > self.config.max_key_phrases as usize {
                debug!(count = phrases.len(), "rejecting phrase model with too many phrases");
                return (status::BAD_VALUE, 0);
            }
        }

        let mut state = self.state.lock();
        if state.models.len() >= self.config.max_sound_models as usize {
            debug!(loaded = state.models.len(), "model capacity reached");
            return (status::NO_MEMORY, 0);
        }

        let handle = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(1).max(1);
        state.models.insert(
            handle,
            LoadedModel {
                model_type,
                phrase_ids: phrases.iter().map(|p| p.id).collect(),
                listener,
                cookie,
                session: None,
            },
        );
        info!(handle, ?model_type, "model loaded");
        (status::OK, handle)
    }

    fn start(
        &self,
        handle: SoundModelHandle,
        config: &v2_0::RecognitionConfig,
        listener: Listener,
        cookie: CallbackCookie,
    ) -> Status {
        let mut state = self.state.lock();
        let Some(model) = state.models.get_mut(&handle) else {
            debug!(handle, "start on unknown model");
            return status::BAD_VALUE;
        };
        if model.session.is_some() {
            return status::BUSY;
        }
        if !config.capture_device.is_input() {
            debug!(device = ?config.capture_device, "capture device is not an input");
            return status::BAD_VALUE;
        }
        if model.model_type == SoundModelType::Keyphrase {
            let unknown = config
                .phrases
                .iter()
                .find(|extra| !model.phrase_ids.contains(&extra.id));
            if let Some(extra) = unknown {
                debug!(handle, phrase = extra.id, "recognition names an unknown phrase");
                return status::BAD_VALUE;
            }
        }

        model.session = Some(Session {
            listener,
            cookie,
            phrases: config.phrases.clone(),
        });
        info!(handle, "recognition started");
        status::OK
    }
}

/// Copy the contents of a shared memory region, treating an empty handle as
/// no data.
fn read_shared(memory: &HidlMemory) -> Result<Vec<u8>, Status> {
    if memory.is_empty() {
        return Ok(Vec::new());
    }
    let mapped = MappedMemory::map(memory).map_err(|e| {
        warn!(error = %e, "cannot map client memory");
        status::BAD_VALUE
    })?;
    mapped.update();
    Ok(mapped.as_slice().to_vec())
}

/// Place `data` in a fresh shared memory region.
fn share(data: &[u8]) -> Result<HidlMemory, Status> {
    if data.is_empty() {
        return Ok(HidlMemory::default());
    }
    let memory = AshmemAllocator::new()
        .create_region(data.len() as u64)
        .map_err(|e| {
            warn!(error = %e, "cannot allocate event memory");
            status::NO_MEMORY
        })?;
    let mut mapped = MappedMemory::map(&memory).map_err(|_| status::NO_MEMORY)?;
    mapped.update();
    mapped.as_mut_slice().copy_from_slice(data);
    mapped.commit();
    Ok(memory)
}

impl SoundTriggerHw for DefaultSoundTriggerHw {
    fn get_properties(&self) -> Return<(Status, v2_0::Properties)> {
        Ok((status::OK, self.config.properties()))
    }

    fn load_sound_model(
        &self,
        model: &v2_0::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        Ok(self.load(
            model.model_type,
            SoundModelType::Generic,
            &model.data,
            &[],
            Listener::V2_0(callback),
            cookie,
        ))
    }

    fn load_phrase_sound_model(
        &self,
        model: &v2_0::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        Ok(self.load(
            model.common.model_type,
            SoundModelType::Keyphrase,
            &model.common.data,
            &model.phrases,
            Listener::V2_0(callback),
            cookie,
        ))
    }

    fn unload_sound_model(&self, model_handle: SoundModelHandle) -> Return<Status> {
        let removed = self.state.lock().models.remove(&model_handle);
        Ok(match removed {
            Some(_) => {
                info!(handle = model_handle, "model unloaded");
                status::OK
            }
            None => status::BAD_VALUE,
        })
    }

    fn start_recognition(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_0::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<Status> {
        Ok(self.start(model_handle, config, Listener::V2_0(callback), cookie))
    }

    fn stop_recognition(&self, model_handle: SoundModelHandle) -> Return<Status> {
        let mut state = self.state.lock();
        let Some(model) = state.models.get_mut(&model_handle) else {
            return Ok(status::BAD_VALUE);
        };
        Ok(match model.session.take() {
            Some(_) => {
                info!(handle = model_handle, "recognition stopped");
                status::OK
            }
            None => status::INVALID_OPERATION,
        })
    }

    fn stop_all_recognitions(&self) -> Return<Status> {
        let mut state = self.state.lock();
        let mut stopped = 0usize;
        for model in state.models.values_mut() {
            if model.session.take().is_some() {
                stopped += 1;
            }
        }
        info!(stopped, "all recognitions stopped");
        Ok(status::OK)
    }
}

impl SoundTriggerHwV2_1 for DefaultSoundTriggerHw {
    fn load_sound_model_2_1(
        &self,
        model: &v2_1::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        let data = match read_shared(&model.data) {
            Ok(data) => data,
            Err(status) => return Ok((status, 0)),
        };
        Ok(self.load(
            model.header.model_type,
            SoundModelType::Generic,
            &data,
            &[],
            Listener::V2_1(callback),
            cookie,
        ))
    }

    fn load_phrase_sound_model_2_1(
        &self,
        model: &v2_1::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        let data = match read_shared(&model.common.data) {
            Ok(data) => data,
            Err(status) => return Ok((status, 0)),
        };
        Ok(self.load(
            model.common.header.model_type,
            SoundModelType::Keyphrase,
            &data,
            &model.phrases,
            Listener::V2_1(callback),
            cookie,
        ))
    }

    fn start_recognition_2_1(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_1::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<Status> {
        if let Err(status) = read_shared(&config.data) {
            return Ok(status);
        }
        Ok(self.start(model_handle, &config.header, Listener::V2_1(callback), cookie))
    }
}
