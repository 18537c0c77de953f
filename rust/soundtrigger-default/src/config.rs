//! Configuration of the reference server.

use soundtrigger_hal::v2_0::{Properties, RecognitionModes, Uuid};

/// What the reference server advertises and enforces.
#[derive(Debug, Clone)]
pub struct DefaultHwConfig {
    pub implementor: String,
    pub description: String,
    /// Implementation version, reported as-is.
    pub version: u32,
    pub uuid: Uuid,
    /// Models that may be loaded at once.
    pub max_sound_models: u32,
    /// Phrases a single phrase model may declare.
    pub max_key_phrases: u32,
    pub max_users: u32,
    pub recognition_modes: RecognitionModes,
}

impl Default for DefaultHwConfig {
    fn default() -> Self {
        Self {
            implementor: "The Android Open Source Project".to_owned(),
            description: "Reference in-process sound trigger".to_owned(),
            version: 0x0002_0001,
            uuid: Uuid {
                time_low: 0xed7a_7d60,
                time_mid: 0xc65e,
                version_and_time_high: 0x11e3,
                variant_and_clock_seq_high: 0x9be4,
                node: [0x00, 0x02, 0xa5, 0xd5, 0xc5, 0x1b],
            },
            max_sound_models: 4,
            max_key_phrases: 1,
            max_users: 1,
            recognition_modes: RecognitionModes::VOICE_TRIGGER
                | RecognitionModes::GENERIC_TRIGGER,
        }
    }
}

impl DefaultHwConfig {
    /// The properties reported by `getProperties`.
    pub fn properties(&self) -> Properties {
        Properties {
            implementor: self.implementor.clone(),
            description: self.description.clone(),
            version: self.version,
            uuid: self.uuid,
            max_sound_models: self.max_sound_models,
            max_key_phrases: self.max_key_phrases,
            max_users: self.max_users,
            recognition_modes: self.recognition_modes,
            capture_transition: false,
            max_buffer_ms: 0,
            concurrent_capture: false,
            trigger_in_event: false,
            power_consumption_mw: 0,
        }
    }
}
