//! Sound Trigger HAL 2.0 types.
//!
//! In 2.0 every payload travels inline as a byte vector. The 2.1 revision
//! (see [`crate::v2_1`]) wraps these types and moves payloads into shared
//! memory.

use bitflags::bitflags;

use crate::audio::{AudioConfig, AudioDevice};

/// Server-assigned handle of a loaded sound model.
pub type SoundModelHandle = i32;

/// Opaque correlation value echoed back into callbacks.
pub type CallbackCookie = i32;

/// Kind of sound model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum SoundModelType {
    /// Not a valid model type for any load operation.
    #[default]
    Unknown = -1,
    /// Key phrase model, loaded through `loadPhraseSoundModel`.
    Keyphrase = 0,
    /// Generic model, loaded through `loadSoundModel`.
    Generic = 1,
}

impl SoundModelType {
    /// Convert from the i32 wire value
    pub fn from_i32(val: i32) -> Option<Self> {
        match val {
            -1 => Some(SoundModelType::Unknown),
            0 => Some(SoundModelType::Keyphrase),
            1 => Some(SoundModelType::Generic),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

bitflags! {
    /// Recognition modes a phrase supports or a session requests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RecognitionModes: u32 {
        /// Simple voice trigger.
        const VOICE_TRIGGER = 1 << 0;
        /// Trigger only if one specific user is identified.
        const USER_IDENTIFICATION = 1 << 1;
        /// Trigger only if one specific user is authenticated.
        const USER_AUTHENTICATION = 1 << 2;
        /// Generic sound trigger.
        const GENERIC_TRIGGER = 1 << 3;
    }
}

/// RFC 4122 UUID in the HAL's field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid {
    pub time_low: u32,
    pub time_mid: u16,
    pub version_and_time_high: u16,
    pub variant_and_clock_seq_high: u16,
    pub node: [u8; 6],
}

/// Confidence level for one enrolled user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfidenceLevel {
    pub user_id: u32,
    /// 0 - 100
    pub level_percent: u32,
}

/// Per-phrase recognition parameters (in a config) or results (in an event).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhraseRecognitionExtra {
    /// Phrase id, matching a [`Phrase::id`] of the loaded model.
    pub id: u32,
    pub recognition_modes: RecognitionModes,
    /// 0 - 100
    pub confidence_level: u32,
    /// Per-user levels, for user identification modes.
    pub levels: Vec<ConfidenceLevel>,
}

/// A key phrase described by a phrase model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Phrase {
    pub id: u32,
    pub recognition_modes: RecognitionModes,
    /// Enrolled user ids.
    pub users: Vec<u32>,
    /// BCP 47 locale, e.g. `en-US`.
    pub locale: String,
    pub text: String,
}

/// A sound model with its vendor payload inline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoundModel {
    pub model_type: SoundModelType,
    pub uuid: Uuid,
    pub vendor_uuid: Uuid,
    /// Vendor-specific model blob.
    pub data: Vec<u8>,
}

/// A key phrase sound model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhraseSoundModel {
    pub common: SoundModel,
    pub phrases: Vec<Phrase>,
}

/// Parameters of a recognition session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecognitionConfig {
    /// IO handle to use for capture when `capture_requested` is set.
    pub capture_handle: i32,
    pub capture_device: AudioDevice,
    /// Whether the client wants the triggering audio.
    pub capture_requested: bool,
    pub phrases: Vec<PhraseRecognitionExtra>,
    /// Vendor-specific parameters.
    pub data: Vec<u8>,
}

/// Implementation capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Properties {
    pub implementor: String,
    pub description: String,
    pub version: u32,
    pub uuid: Uuid,
    pub max_sound_models: u32,
    pub max_key_phrases: u32,
    pub max_users: u32,
    pub recognition_modes: RecognitionModes,
    pub capture_transition: bool,
    pub max_buffer_ms: u32,
    pub concurrent_capture: bool,
    pub trigger_in_event: bool,
    pub power_consumption_mw: u32,
}

/// Outcome reported by a recognition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum RecognitionStatus {
    #[default]
    Success = 0,
    Abort = 1,
    Failure = 2,
}

/// Outcome reported by a model event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum SoundModelStatus {
    /// The vendor updated the model in place.
    #[default]
    Updated = 0,
}

/// Generic recognition event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecognitionEvent {
    pub status: RecognitionStatus,
    pub model_type: SoundModelType,
    pub model: SoundModelHandle,
    pub capture_available: bool,
    pub capture_session: i32,
    pub capture_delay_ms: i32,
    pub capture_preamble_ms: i32,
    pub trigger_in_data: bool,
    pub audio_config: AudioConfig,
    pub data: Vec<u8>,
}

/// Key phrase recognition event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhraseRecognitionEvent {
    pub common: RecognitionEvent,
    pub phrase_extras: Vec<PhraseRecognitionExtra>,
}

/// Event about a loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelEvent {
    pub status: SoundModelStatus,
    pub model: SoundModelHandle,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_type_wire_values() {
        assert_eq!(SoundModelType::Unknown.as_i32(), -1);
        assert_eq!(SoundModelType::Keyphrase.as_i32(), 0);
        assert_eq!(SoundModelType::Generic.as_i32(), 1);
        assert_eq!(SoundModelType::from_i32(1), Some(SoundModelType::Generic));
        assert_eq!(SoundModelType::from_i32(2), None);
    }

    #[test]
    fn recognition_mode_bits() {
        assert_eq!(RecognitionModes::VOICE_TRIGGER.bits(), 1);
        assert_eq!(RecognitionModes::GENERIC_TRIGGER.bits(), 8);
        let modes = RecognitionModes::VOICE_TRIGGER | RecognitionModes::USER_IDENTIFICATION;
        assert_eq!(modes.bits(), 3);
        assert_eq!(RecognitionModes::from_bits(16), None);
    }

    #[test]
    fn default_model_has_no_payload() {
        let model = SoundModel::default();
        assert_eq!(model.model_type, SoundModelType::Unknown);
        assert!(model.data.is_empty());
    }
}
