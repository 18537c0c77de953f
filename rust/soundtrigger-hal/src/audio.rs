//! Audio framework types referenced by the Sound Trigger HAL.

/// Marks a device value as an input device.
pub const AUDIO_DEVICE_BIT_IN: u32 = 0x8000_0000;

/// Input devices a recognition session can capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum AudioDevice {
    #[default]
    None = 0,
    InCommunication = AUDIO_DEVICE_BIT_IN | 0x1,
    InAmbient = AUDIO_DEVICE_BIT_IN | 0x2,
    InBuiltinMic = AUDIO_DEVICE_BIT_IN | 0x4,
    InBluetoothScoHeadset = AUDIO_DEVICE_BIT_IN | 0x8,
    InWiredHeadset = AUDIO_DEVICE_BIT_IN | 0x10,
    InBackMic = AUDIO_DEVICE_BIT_IN | 0x80,
}

impl AudioDevice {
    /// Convert from the u32 wire value
    pub fn from_u32(val: u32) -> Option<Self> {
        match val {
            0 => Some(AudioDevice::None),
            v if v == AudioDevice::InCommunication as u32 => Some(AudioDevice::InCommunication),
            v if v == AudioDevice::InAmbient as u32 => Some(AudioDevice::InAmbient),
            v if v == AudioDevice::InBuiltinMic as u32 => Some(AudioDevice::InBuiltinMic),
            v if v == AudioDevice::InBluetoothScoHeadset as u32 => {
                Some(AudioDevice::InBluetoothScoHeadset)
            }
            v if v == AudioDevice::InWiredHeadset as u32 => Some(AudioDevice::InWiredHeadset),
            v if v == AudioDevice::InBackMic as u32 => Some(AudioDevice::InBackMic),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_input(self) -> bool {
        self.as_u32() & AUDIO_DEVICE_BIT_IN != 0
    }
}

/// PCM sample format of captured audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Default,
    Pcm16Bit,
    Pcm8_24Bit,
    PcmFloat,
}

/// Shape of the audio attached to a recognition event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channel_mask: u32,
    pub format: AudioFormat,
    pub frame_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_mic_value() {
        assert_eq!(AudioDevice::InBuiltinMic.as_u32(), 0x8000_0004);
        assert!(AudioDevice::InBuiltinMic.is_input());
        assert!(!AudioDevice::None.is_input());
    }

    #[test]
    fn device_wire_values() {
        for device in [
            AudioDevice::None,
            AudioDevice::InCommunication,
            AudioDevice::InAmbient,
            AudioDevice::InBuiltinMic,
            AudioDevice::InBluetoothScoHeadset,
            AudioDevice::InWiredHeadset,
            AudioDevice::InBackMic,
        ] {
            assert_eq!(AudioDevice::from_u32(device.as_u32()), Some(device));
        }
        assert_eq!(AudioDevice::from_u32(0x4), None);
    }
}
