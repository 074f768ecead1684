//! SDL2 audio playback of the piezo sample ring.
//!
//! The emulation loop pushes one-bit samples into the shared ring; the SDL
//! callback thread mixes them down to 44.1 kHz mono through a
//! [`PiezoMixer`]. Output is unsigned 8-bit by default or normalized
//! 32-bit float on request.

use hx20_core::device::piezo::{PiezoMixer, PiezoRing};
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

const SAMPLE_RATE: i32 = 44_100;
/// Mixer gain, 0..=127.
const VOLUME: i16 = 16;

pub struct PiezoPlayerU8 {
    mixer: PiezoMixer,
}

impl AudioCallback for PiezoPlayerU8 {
    type Channel = u8;
    fn callback(&mut self, out: &mut [u8]) {
        for sample in out.iter_mut() {
            *sample = self.mixer.next_u8();
        }
    }
}

pub struct PiezoPlayerF32 {
    mixer: PiezoMixer,
}

impl AudioCallback for PiezoPlayerF32 {
    type Channel = f32;
    fn callback(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.mixer.next_f32();
        }
    }
}

/// Running audio device; dropping it stops playback.
pub enum AudioOutput {
    U8(AudioDevice<PiezoPlayerU8>),
    F32(AudioDevice<PiezoPlayerF32>),
}

/// Open the playback device and start consuming the piezo ring.
pub fn init(
    sdl_audio: &sdl2::AudioSubsystem,
    ring: PiezoRing,
    float_format: bool,
) -> Result<AudioOutput, String> {
    let desired_spec = AudioSpecDesired {
        freq: Some(SAMPLE_RATE),
        channels: Some(1),
        samples: Some(2048),
    };

    let output = if float_format {
        let device = sdl_audio.open_playback(None, &desired_spec, |_spec| PiezoPlayerF32 {
            mixer: PiezoMixer::new(ring, VOLUME),
        })?;
        AudioOutput::F32(device)
    } else {
        let device = sdl_audio.open_playback(None, &desired_spec, |_spec| PiezoPlayerU8 {
            mixer: PiezoMixer::new(ring, VOLUME),
        })?;
        AudioOutput::U8(device)
    };

    match &output {
        AudioOutput::U8(device) => device.resume(),
        AudioOutput::F32(device) => device.resume(),
    }
    Ok(output)
}
