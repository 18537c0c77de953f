//! The callback object handed to the HAL under test.

use std::sync::{Arc, Weak};

use soundtrigger_hal::{
    CallbackCookie, Return, SoundTriggerHwCallback, SoundTriggerHwCallbackV2_1, v2_0, v2_1,
};
use tracing::{debug, info};

use crate::fixture::FixtureState;

/// Receives every event the HAL sends for the current fixture.
///
/// Model events are recorded on the fixture and tick its monitor.
/// Recognition events are acknowledged and otherwise ignored. Every entry
/// point acknowledges success, including after the fixture is gone.
pub struct CallbackSink {
    fixture: Weak<FixtureState>,
}

impl CallbackSink {
    pub fn new(fixture: &Arc<FixtureState>) -> Arc<Self> {
        Arc::new(Self {
            fixture: Arc::downgrade(fixture),
        })
    }

    fn fixture(&self) -> Option<Arc<FixtureState>> {
        let fixture = self.fixture.upgrade();
        if fixture.is_none() {
            debug!("event arrived after fixture teardown");
        }
        fixture
    }
}

impl SoundTriggerHwCallback for CallbackSink {
    fn recognition_callback(
        &self,
        event: &v2_0::RecognitionEvent,
        _cookie: CallbackCookie,
    ) -> Return<()> {
        info!(model = event.model, "recognitionCallback");
        Ok(())
    }

    fn phrase_recognition_callback(
        &self,
        event: &v2_0::PhraseRecognitionEvent,
        _cookie: CallbackCookie,
    ) -> Return<()> {
        info!(model = event.common.model, "phraseRecognitionCallback");
        Ok(())
    }

    fn sound_model_callback(
        &self,
        event: &v2_0::ModelEvent,
        _cookie: CallbackCookie,
    ) -> Return<()> {
        info!(model = event.model, "soundModelCallback");
        if let Some(fixture) = self.fixture() {
            fixture.record_model_event_2_0(event.clone());
        }
        Ok(())
    }
}

impl SoundTriggerHwCallbackV2_1 for CallbackSink {
    fn recognition_callback_2_1(
        &self,
        event: &v2_1::RecognitionEvent,
        _cookie: CallbackCookie,
    ) -> Return<()> {
        info!(model = event.header.model, "recognitionCallback_2_1");
        Ok(())
    }

    fn phrase_recognition_callback_2_1(
        &self,
        event: &v2_1::PhraseRecognitionEvent,
        _cookie: CallbackCookie,
    ) -> Return<()> {
        info!(model = event.common.header.model, "phraseRecognitionCallback_2_1");
        Ok(())
    }

    fn sound_model_callback_2_1(
        &self,
        event: &v2_1::ModelEvent,
        _cookie: CallbackCookie,
    ) -> Return<()> {
        info!(model = event.header.model, "soundModelCallback_2_1");
        if let Some(fixture) = self.fixture() {
            fixture.record_model_event(event.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn model_event(model: i32) -> v2_0::ModelEvent {
        v2_0::ModelEvent {
            model,
            data: vec![1, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn model_events_are_recorded_and_notified() {
        let state = Arc::new(FixtureState::default());
        let sink = CallbackSink::new(&state);

        sink.sound_model_callback(&model_event(3), 0).unwrap();
        assert!(state.monitor().wait(Duration::ZERO));
        assert_eq!(state.last_model_event_2_0(), Some(model_event(3)));
        assert!(state.last_model_event().is_none());

        let event = v2_1::ModelEvent {
            header: model_event(4),
            data: Default::default(),
        };
        sink.sound_model_callback_2_1(&event, 0).unwrap();
        assert!(state.monitor().wait(Duration::ZERO));
        assert_eq!(state.last_model_event().map(|e| e.header.model), Some(4));
    }

    #[test]
    fn recognition_events_do_not_notify() {
        let state = Arc::new(FixtureState::default());
        let sink = CallbackSink::new(&state);

        sink.recognition_callback(&Default::default(), 0).unwrap();
        sink.phrase_recognition_callback(&Default::default(), 0).unwrap();
        sink.recognition_callback_2_1(&Default::default(), 0).unwrap();
        sink.phrase_recognition_callback_2_1(&Default::default(), 0).unwrap();

        assert_eq!(state.monitor().pending(), 0);
    }

    #[test]
    fn events_after_teardown_are_acknowledged() {
        let state = Arc::new(FixtureState::default());
        let sink = CallbackSink::new(&state);
        drop(state);

        assert!(sink.sound_model_callback(&model_event(1), 0).is_ok());
        assert!(sink.sound_model_callback_2_1(&Default::default(), 0).is_ok());
    }

    #[test]
    fn concurrent_events_all_count() {
        let state = Arc::new(FixtureState::default());
        let sink = CallbackSink::new(&state);

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || sink.sound_model_callback(&model_event(i), 0))
            })
            .collect();
        for thread in threads {
            thread.join().unwrap().unwrap();
        }

        for _ in 0..4 {
            assert!(state.monitor().wait(Duration::ZERO));
        }
        assert!(!state.monitor().wait(Duration::ZERO));
    }
}
