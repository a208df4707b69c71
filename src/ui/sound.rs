/// Sound effects: short procedural chiptune cues played via rodio.
///
/// Every cue is synthesized once at start-up into an in-memory WAV buffer;
/// playback appends it to a detached `Sink` and returns immediately.
///
/// Without the "sound" feature `SoundEngine` is a stub whose methods do
/// nothing, so callers never need their own `cfg`.

use crate::sim::event::LevelEvent;
use crate::domain::entity::DustKind;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        jump: Arc<Vec<u8>>,
        land: Arc<Vec<u8>>,
        goal: Arc<Vec<u8>>,
        fall: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "audio_unavailable");
                    return None;
                }
            };
            Some(SoundEngine {
                _stream: stream,
                handle,
                jump: Arc::new(encode_wav(&sweep(220.0, 660.0, 0.10, 0.25))),
                land: Arc::new(encode_wav(&thud())),
                goal: Arc::new(encode_wav(&arpeggio(&[523.0, 659.0, 784.0, 1047.0], 0.09))),
                fall: Arc::new(encode_wav(&sweep(700.0, 120.0, 0.45, 0.25))),
            })
        }

        fn play(&self, wav: &Arc<Vec<u8>>) {
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            if let Ok(src) = rodio::Decoder::new(Cursor::new(wav.as_ref().clone())) {
                sink.append(src);
                sink.detach();
            }
        }

        pub fn play_jump(&self) { self.play(&self.jump); }
        pub fn play_land(&self) { self.play(&self.land); }
        pub fn play_goal(&self) { self.play(&self.goal); }
        pub fn play_fall(&self) { self.play(&self.fall); }
    }

    // ── Synthesis (mono f32 in -1..1) ──

    fn samples_for(seconds: f32) -> usize {
        (SAMPLE_RATE as f32 * seconds) as usize
    }

    /// Sine glide from `from` Hz to `to` Hz with a linear fade-out.
    /// Phase is accumulated so the glide has no clicks.
    fn sweep(from: f32, to: f32, seconds: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(seconds);
        let mut phase = 0.0_f32;
        (0..n).map(|i| {
            let t = i as f32 / n as f32;
            phase += (from + (to - from) * t) * TAU / SAMPLE_RATE as f32;
            phase.sin() * (1.0 - t) * volume
        }).collect()
    }

    /// Low square pulse with a fast decay: feet hitting the ground.
    fn thud() -> Vec<f32> {
        let n = samples_for(0.06);
        (0..n).map(|i| {
            let t = i as f32 / n as f32;
            let s = (i as f32 * 90.0 * TAU / SAMPLE_RATE as f32).sin().signum();
            s * (1.0 - t).powi(3) * 0.2
        }).collect()
    }

    /// Notes played back to back, each with a short decay; the last rings out.
    fn arpeggio(notes: &[f32], note_seconds: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for (k, &freq) in notes.iter().enumerate() {
            let seconds = if k + 1 == notes.len() { note_seconds * 3.0 } else { note_seconds };
            let n = samples_for(seconds);
            out.extend((0..n).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                ((t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3) * env * 0.3
            }));
        }
        out
    }

    // ── WAV (RIFF, PCM 16-bit mono) ──

    pub(super) fn encode_wav(samples: &[f32]) -> Vec<u8> {
        const BITS: u16 = 16;
        const CHANNELS: u16 = 1;
        let block_align = CHANNELS * BITS / 8;
        let data_len = samples.len() as u32 * block_align as u32;

        let mut wav = Vec::with_capacity(44 + data_len as usize);
        let mut chunk = |tag: &[u8], body: &[u8]| {
            wav.extend_from_slice(tag);
            wav.extend_from_slice(body);
        };
        chunk(b"RIFF", &(36 + data_len).to_le_bytes());
        chunk(b"WAVE", &[]);

        let mut fmt = Vec::with_capacity(20);
        fmt.extend_from_slice(&16u32.to_le_bytes());
        fmt.extend_from_slice(&1u16.to_le_bytes());
        fmt.extend_from_slice(&CHANNELS.to_le_bytes());
        fmt.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        fmt.extend_from_slice(&(SAMPLE_RATE * block_align as u32).to_le_bytes());
        fmt.extend_from_slice(&block_align.to_le_bytes());
        fmt.extend_from_slice(&BITS.to_le_bytes());
        chunk(b"fmt ", &fmt);
        chunk(b"data", &data_len.to_le_bytes());

        for &s in samples {
            let pcm = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            wav.extend_from_slice(&pcm.to_le_bytes());
        }
        wav
    }
}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_jump(&self) {}
    pub fn play_land(&self) {}
    pub fn play_goal(&self) {}
    pub fn play_fall(&self) {}
}

/// Play the cue for each frame event that has one.
pub fn play_events(sound: Option<&SoundEngine>, events: &[LevelEvent]) {
    let Some(sfx) = sound else { return };
    for event in events {
        match event {
            LevelEvent::Dust { kind: DustKind::Jump, .. } => sfx.play_jump(),
            LevelEvent::Dust { kind: DustKind::Land, .. } => sfx.play_land(),
            LevelEvent::GoalReached => sfx.play_goal(),
            LevelEvent::PlayerFell => sfx.play_fall(),
            LevelEvent::EnemiesTurned { .. } => {}
        }
    }
}

#[cfg(all(test, feature = "sound"))]
mod tests {
    use super::inner::encode_wav;

    #[test]
    fn wav_header_sizes() {
        let wav = encode_wav(&[0.0, 1.0, -1.0]);
        assert_eq!(wav.len(), 44 + 6);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 6);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), i16::MAX);
    }
}
