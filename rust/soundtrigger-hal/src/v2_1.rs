//! Sound Trigger HAL 2.1 types.
//!
//! Each 2.1 type nests its 2.0 counterpart and carries the vendor payload in
//! shared memory instead of inline. The nested 2.0 `data` vector is expected
//! to be empty.

use hidl_memory::HidlMemory;

use crate::v2_0;

/// A sound model whose payload lives in shared memory.
#[derive(Debug, Clone, Default)]
pub struct SoundModel {
    pub header: v2_0::SoundModel,
    pub data: HidlMemory,
}

/// A key phrase sound model whose payload lives in shared memory.
#[derive(Debug, Clone, Default)]
pub struct PhraseSoundModel {
    pub common: SoundModel,
    pub phrases: Vec<v2_0::Phrase>,
}

/// Recognition parameters with vendor data in shared memory.
#[derive(Debug, Clone, Default)]
pub struct RecognitionConfig {
    pub header: v2_0::RecognitionConfig,
    pub data: HidlMemory,
}

/// Generic recognition event with vendor data in shared memory.
#[derive(Debug, Clone, Default)]
pub struct RecognitionEvent {
    pub header: v2_0::RecognitionEvent,
    pub data: HidlMemory,
}

/// Key phrase recognition event with vendor data in shared memory.
#[derive(Debug, Clone, Default)]
pub struct PhraseRecognitionEvent {
    pub common: RecognitionEvent,
    pub phrase_extras: Vec<v2_0::PhraseRecognitionExtra>,
}

/// Model event with vendor data in shared memory.
#[derive(Debug, Clone, Default)]
pub struct ModelEvent {
    pub header: v2_0::ModelEvent,
    pub data: HidlMemory,
}
