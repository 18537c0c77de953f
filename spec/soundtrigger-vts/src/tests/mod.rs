//! The conformance cases.
//!
//! Every case probes one HAL operation with an argument the HAL must refuse,
//! and checks three things: the call completes at the transport level, the
//! HAL reports an error status, and (for loads) no model callback follows.


use crate::fixture::Fixture;
use crate::testcase::TestResult;

/// A named case, run once per discovered instance.
pub struct Case {
    pub name: &'static str,
    pub func: fn(&Fixture<'_>) -> TestResult,
}

/// All cases, in run order.
pub const CASES: &[Case] = &[
    Case {
        name: "LoadInvalidModelFail_2_1",
        func: load::load_invalid_model_fail_2_1,
    },
    Case {
        name: "LoadEmptyGenericSoundModelFail",
        func: load::load_empty_generic_sound_model_fail,
    },
    Case {
        name: "LoadEmptyGenericSoundModelFail_2_1",
        func: load::load_empty_generic_sound_model_fail_2_1,
    },
    Case {
        name: "LoadGenericSoundModelFail_2_1",
        func: load::load_generic_sound_model_fail_2_1,
    },
    Case {
        name: "StartRecognitionNoModelFail_2_1",
        func: recognition::start_recognition_no_model_fail_2_1,
    },
];

/// Look a case up by name.
pub fn find(name: &str) -> Option<&'static Case> {
    CASES.iter().find(|case| case.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn case_names_are_unique() {
        let names: HashSet<_> = CASES.iter().map(|case| case.name).collect();
        assert_eq!(names.len(), CASES.len());
    }

    #[test]
    fn find_by_name() {
        assert!(find("LoadGenericSoundModelFail_2_1").is_some());
        assert!(find("NoSuchCase").is_none());
    }
}
