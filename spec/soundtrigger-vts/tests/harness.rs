//! Harness behaviour against well-behaved and broken servers.

use std::sync::Arc;
use std::time::Duration;

use hal_service_manager::ServiceManager;
use hidl_memory::{ASHMEM_INSTANCE, Allocator, AshmemAllocator, map_memory};
use parking_lot::Mutex;
use soundtrigger_default::{DefaultHwConfig, DefaultSoundTriggerHw, Fault, FaultyHw};
use soundtrigger_hal::{
    CallbackCookie, Return, SoundModelHandle, SoundTriggerHw, SoundTriggerHwCallback,
    SoundTriggerHwCallbackV2_1, SoundTriggerHwV2_1, Status, register_sound_trigger_hw, v2_0,
    v2_1,
};
use soundtrigger_vts::suite::{self, Suite, run_case};
use soundtrigger_vts::tests::{CASES, find};
use soundtrigger_vts::{Fixture, SuiteConfig, SuiteRng, TestResult};

fn fast_config() -> SuiteConfig {
    SuiteConfig {
        short_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}

fn reference_hw() -> Arc<DefaultSoundTriggerHw> {
    Arc::new(DefaultSoundTriggerHw::new(DefaultHwConfig::default()).unwrap())
}

fn register_allocator(manager: &ServiceManager) {
    let allocator: Arc<dyn Allocator> = Arc::new(AshmemAllocator::new());
    manager
        .add_service::<dyn Allocator>(ASHMEM_INSTANCE, allocator)
        .unwrap();
}

fn manager_with(hal: Arc<dyn SoundTriggerHwV2_1>) -> ServiceManager {
    let manager = ServiceManager::new();
    register_sound_trigger_hw(&manager, "default", hal).unwrap();
    register_allocator(&manager);
    manager
}

fn run_all(manager: &ServiceManager) -> Vec<(&'static str, TestResult)> {
    run_all_with(manager, &fast_config())
}

fn run_all_with(
    manager: &ServiceManager,
    config: &SuiteConfig,
) -> Vec<(&'static str, TestResult)> {
    let rng = SuiteRng::new();
    CASES
        .iter()
        .map(|case| (case.name, run_case(manager, "default", case, config, &rng)))
        .collect()
}

fn faulty(fault: Fault) -> Arc<FaultyHw> {
    let hw = Arc::new(FaultyHw::new(reference_hw()).unwrap());
    hw.set_fault(fault);
    hw
}

#[test]
fn reference_server_passes_every_case() {
    let manager = ServiceManager::new();
    soundtrigger_default::serve_default(&manager, DefaultHwConfig::default()).unwrap();

    for (name, result) in run_all(&manager) {
        assert!(result.is_pass(), "{} failed: {:?}", name, result.message());
    }
}

#[test]
fn dead_transport_fails_every_case() {
    let manager = manager_with(faulty(Fault::DeadObject));

    for (name, result) in run_all(&manager) {
        let message = result.message().unwrap_or_default();
        assert!(message.contains("transport failed"), "{}: {}", name, message);
        // The pre-set status keeps the status expectation satisfied.
        assert!(!message.contains("expected an error status"), "{}: {}", name, message);
    }
}

#[test]
fn accepting_server_fails_every_case() {
    let manager = manager_with(faulty(Fault::AcceptAll));

    for (name, result) in run_all(&manager) {
        let message = result.message().unwrap_or_default();
        assert!(message.contains("expected an error status"), "{}: {}", name, message);
    }
}

#[test]
fn spurious_model_callbacks_fail_load_cases() {
    let manager = manager_with(faulty(Fault::SpuriousCallback));
    // The event arrives from the callback thread after the load returns, so
    // the quiet window has to outlast the server's delay.
    let config = SuiteConfig {
        short_timeout: FaultyHw::SPURIOUS_DELAY * 25,
        ..Default::default()
    };

    for (name, result) in run_all_with(&manager, &config) {
        if name.starts_with("Load") {
            let message = result.message().unwrap_or_default();
            assert!(message.contains("unexpected model callback"), "{}: {}", name, message);
        } else {
            // Recognition events do not tick the monitor.
            assert!(result.is_pass(), "{}: {:?}", name, result.message());
        }
    }
}

#[test]
fn missing_allocator_aborts_only_the_payload_case() {
    let manager = ServiceManager::new();
    register_sound_trigger_hw(&manager, "default", reference_hw()).unwrap();

    for (name, result) in run_all(&manager) {
        if name == "LoadGenericSoundModelFail_2_1" {
            let message = result.message().unwrap_or_default();
            assert!(message.contains("allocator"), "{}", message);
        } else {
            assert!(result.is_pass(), "{}: {:?}", name, result.message());
        }
    }
}

#[test]
fn no_instances_means_no_trials() {
    let manager: &'static ServiceManager = Box::leak(Box::new(ServiceManager::new()));
    register_allocator(manager);

    assert!(suite::discover_instances(manager).is_empty());
    assert!(Suite::new(manager).trials().is_empty());
}

#[test]
fn one_trial_per_instance_and_case() {
    let manager: &'static ServiceManager = Box::leak(Box::new(ServiceManager::new()));
    register_sound_trigger_hw(manager, "default", reference_hw()).unwrap();
    register_sound_trigger_hw(manager, "vendor.dsp", reference_hw()).unwrap();

    // A 2.0-only registration is not a 2.1 instance.
    let legacy: Arc<dyn SoundTriggerHw> = reference_hw();
    manager
        .add_service::<dyn SoundTriggerHw>("legacy", legacy)
        .unwrap();

    assert_eq!(
        suite::discover_instances(manager),
        vec!["default".to_owned(), "vendor.dsp".to_owned()]
    );

    let trials = Suite::with_config(manager, fast_config()).trials();
    assert_eq!(trials.len(), 2 * CASES.len());
    assert_eq!(
        trials[0].name(),
        "PerInstance/SoundTriggerHidlTest.LoadInvalidModelFail_2_1/default"
    );
    assert_eq!(
        trials[trials.len() - 1].name(),
        "PerInstance/SoundTriggerHidlTest.StartRecognitionNoModelFail_2_1/vendor_dsp"
    );
}

#[test]
fn fixture_set_up_seeds_the_suite_rng() {
    let manager = manager_with(reference_hw());
    let rng = SuiteRng::new();

    let fixture = Fixture::set_up(&manager, "default", &fast_config(), &rng).unwrap();
    assert!(rng.is_seeded());
    assert_eq!(fixture.instance(), "default");
    assert_eq!(fixture.monitor().pending(), 0);
}

/// Forwards to a reference server and keeps every 2.1 generic payload it
/// is asked to load.
struct RecordingHw {
    inner: Arc<DefaultSoundTriggerHw>,
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl SoundTriggerHw for RecordingHw {
    fn get_properties(&self) -> Return<(Status, v2_0::Properties)> {
        self.inner.get_properties()
    }

    fn load_sound_model(
        &self,
        model: &v2_0::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        self.inner.load_sound_model(model, callback, cookie)
    }

    fn load_phrase_sound_model(
        &self,
        model: &v2_0::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        self.inner.load_phrase_sound_model(model, callback, cookie)
    }

    fn unload_sound_model(&self, model_handle: SoundModelHandle) -> Return<Status> {
        self.inner.unload_sound_model(model_handle)
    }

    fn start_recognition(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_0::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallback>,
        cookie: CallbackCookie,
    ) -> Return<Status> {
        self.inner
            .start_recognition(model_handle, config, callback, cookie)
    }

    fn stop_recognition(&self, model_handle: SoundModelHandle) -> Return<Status> {
        self.inner.stop_recognition(model_handle)
    }

    fn stop_all_recognitions(&self) -> Return<Status> {
        self.inner.stop_all_recognitions()
    }
}

impl SoundTriggerHwV2_1 for RecordingHw {
    fn load_sound_model_2_1(
        &self,
        model: &v2_1::SoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        if let Some(mapped) = map_memory(&model.data) {
            self.payloads.lock().push(mapped.as_slice().to_vec());
        }
        self.inner.load_sound_model_2_1(model, callback, cookie)
    }

    fn load_phrase_sound_model_2_1(
        &self,
        model: &v2_1::PhraseSoundModel,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<(Status, SoundModelHandle)> {
        self.inner
            .load_phrase_sound_model_2_1(model, callback, cookie)
    }

    fn start_recognition_2_1(
        &self,
        model_handle: SoundModelHandle,
        config: &v2_1::RecognitionConfig,
        callback: Arc<dyn SoundTriggerHwCallbackV2_1>,
        cookie: CallbackCookie,
    ) -> Return<Status> {
        self.inner
            .start_recognition_2_1(model_handle, config, callback, cookie)
    }
}

#[test]
fn random_payload_is_reproducible_across_runs() {
    let recorder = Arc::new(RecordingHw {
        inner: reference_hw(),
        payloads: Mutex::new(Vec::new()),
    });
    let manager = manager_with(recorder.clone());
    let case = find("LoadGenericSoundModelFail_2_1").unwrap();
    let config = fast_config();

    // Two separate suite runs, each with its own freshly seeded generator.
    for _ in 0..2 {
        let result = run_case(&manager, "default", case, &config, &SuiteRng::new());
        assert!(result.is_pass(), "{:?}", result.message());
    }

    let payloads = recorder.payloads.lock();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].len(), 100);
    assert_eq!(payloads[0], payloads[1]);

    let expected = SuiteRng::new();
    expected.seed_once(1234);
    let mut bytes = vec![0u8; 100];
    expected.fill(&mut bytes);
    assert_eq!(payloads[0], bytes);
}
