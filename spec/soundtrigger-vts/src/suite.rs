//! Discovery and parameterization.
//!
//! Every instance registered for the 2.1 descriptor gets its own fixture for
//! every case. Trials are named the way the platform's gtest runner names
//! parameterized tests:
//!
//! ```text
//! PerInstance/SoundTriggerHidlTest.LoadEmptyGenericSoundModelFail/default
//! ```

use hal_service_manager::{HalInterface, ServiceManager};
use libtest_mimic::{Arguments, Conclusion, Trial};
use soundtrigger_hal::SoundTriggerHwV2_1;
use tracing::{info, warn};

use crate::config::SuiteConfig;
use crate::fixture::Fixture;
use crate::rng::SuiteRng;
use crate::testcase::TestResult;
use crate::tests::{CASES, Case};

pub const INSTANTIATION_NAME: &str = "PerInstance";
pub const TEST_SUITE_NAME: &str = "SoundTriggerHidlTest";

/// Instance names registered for the 2.1 interface, sorted.
pub fn discover_instances(manager: &ServiceManager) -> Vec<String> {
    manager.list_instances(<dyn SoundTriggerHwV2_1>::DESCRIPTOR)
}

/// Make an instance name safe for a test name: anything but ASCII
/// alphanumerics becomes `_`.
pub fn sanitize_instance_name(instance: &str) -> String {
    instance
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn trial_name(case: &str, instance: &str) -> String {
    format!(
        "{}/{}.{}/{}",
        INSTANTIATION_NAME,
        TEST_SUITE_NAME,
        case,
        sanitize_instance_name(instance)
    )
}

/// Set up a fixture for `instance` and run `case` in it.
pub fn run_case(
    manager: &ServiceManager,
    instance: &str,
    case: &Case,
    config: &SuiteConfig,
    rng: &SuiteRng,
) -> TestResult {
    let fixture = match Fixture::set_up(manager, instance, config, rng) {
        Ok(fixture) => fixture,
        Err(e) => return TestResult::fail(format!("fixture set-up failed: {}", e)),
    };

    info!(case = case.name, instance, "running");
    let result = (case.func)(&fixture);
    if let TestResult::Fail(message) = &result {
        warn!(case = case.name, instance, %message, "case failed");
    }
    result
}

/// Runner arguments from the command line, single-threaded unless the
/// caller asks otherwise.
pub fn arguments() -> Arguments {
    let mut args = Arguments::from_args();
    if args.test_threads.is_none() {
        args.test_threads = Some(1);
    }
    args
}

/// The suite over every instance found in one service manager.
pub struct Suite {
    manager: &'static ServiceManager,
    config: SuiteConfig,
    rng: SuiteRng,
}

impl Suite {
    pub fn new(manager: &'static ServiceManager) -> Self {
        Self::with_config(manager, SuiteConfig::default())
    }

    pub fn with_config(manager: &'static ServiceManager, config: SuiteConfig) -> Self {
        Self {
            manager,
            config,
            rng: SuiteRng::new(),
        }
    }

    /// One trial per (instance, case), instance-major. No instances yields
    /// no trials.
    pub fn trials(&self) -> Vec<Trial> {
        let instances = discover_instances(self.manager);
        if instances.is_empty() {
            warn!(
                descriptor = <dyn SoundTriggerHwV2_1>::DESCRIPTOR,
                "no instances registered"
            );
        }

        let mut trials = Vec::with_capacity(instances.len() * CASES.len());
        for instance in &instances {
            for case in CASES {
                let manager = self.manager;
                let instance = instance.clone();
                let config = self.config.clone();
                let rng = self.rng.clone();
                trials.push(Trial::test(trial_name(case.name, &instance), move || {
                    run_case(manager, &instance, case, &config, &rng).into()
                }));
            }
        }
        trials
    }

    pub fn run(&self, args: &Arguments) -> Conclusion {
        libtest_mimic::run(args, self.trials())
    }
}
