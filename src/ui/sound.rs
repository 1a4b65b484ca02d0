/// Sound: procedural cues behind the `AudioSink` seam.
///
/// All cues are generated as in-memory WAV buffers at init time and
/// played through rodio. A non-interrupting cue is dropped while another
/// is still playing; an interrupting one cuts it off.
///
/// Compile without the "sound" feature to get the silent stub engine.

use crate::sim::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Theme,
    Chomp,
    EatGhost,
    Death,
}

/// Platform audio output.
pub trait AudioSink {
    fn play(&mut self, cue: Cue, interrupt_current: bool, rate: f32);
    fn is_playing(&self) -> bool;
}

/// The cue an event triggers, and whether it interrupts. Attract mode is
/// silent.
pub fn cue_for(event: &GameEvent) -> Option<(Cue, bool)> {
    match *event {
        GameEvent::GameStarted => Some((Cue::Theme, true)),
        GameEvent::DotEaten { in_demo: false, .. } | GameEvent::PillEaten { in_demo: false, .. } => {
            Some((Cue::Chomp, false))
        }
        GameEvent::GhostEaten { in_demo: false, .. } => Some((Cue::EatGhost, true)),
        GameEvent::PacmanDied { in_demo: false, .. } => Some((Cue::Death, true)),
        _ => None,
    }
}

/// Play the cues for one frame's events. Returns true when a death cue
/// was started; the loop waits for it before going on.
pub fn play_events(sink: &mut dyn AudioSink, events: &[GameEvent]) -> bool {
    let mut death = false;
    for ev in events {
        if let Some((cue, interrupt)) = cue_for(ev) {
            sink.play(cue, interrupt, 1.0);
            death |= cue == Cue::Death;
        }
    }
    death
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use log::warn;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use super::{AudioSink, Cue};

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers for each cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        current: Option<Sink>,
        theme: Arc<Vec<u8>>,
        chomp: Arc<Vec<u8>>,
        eat_ghost: Arc<Vec<u8>>,
        death: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio device, sound disabled: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                current: None,
                theme: Arc::new(make_wav(&gen_theme())),
                chomp: Arc::new(make_wav(&gen_chomp())),
                eat_ghost: Arc::new(make_wav(&gen_eat_ghost())),
                death: Arc::new(make_wav(&gen_death())),
            })
        }

        fn buffer(&self, cue: Cue) -> &Arc<Vec<u8>> {
            match cue {
                Cue::Theme => &self.theme,
                Cue::Chomp => &self.chomp,
                Cue::EatGhost => &self.eat_ghost,
                Cue::Death => &self.death,
            }
        }
    }

    impl AudioSink for SoundEngine {
        fn play(&mut self, cue: Cue, interrupt_current: bool, rate: f32) {
            if self.is_playing() {
                if !interrupt_current {
                    return;
                }
                if let Some(sink) = self.current.take() {
                    sink.stop();
                }
            }
            let sink = match Sink::try_new(&self.handle) {
                Ok(sink) => sink,
                Err(e) => {
                    warn!("audio sink unavailable: {e}");
                    return;
                }
            };
            let cursor = Cursor::new(self.buffer(cue).as_ref().clone());
            if let Ok(src) = rodio::Decoder::new(cursor) {
                sink.append(src.speed(rate));
                self.current = Some(sink);
            }
        }

        fn is_playing(&self) -> bool {
            self.current.as_ref().map_or(false, |s| !s.empty())
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators (mono f32 samples)
    // ════════════════════════════════════════════════════════════

    fn square(phase: f32) -> f32 {
        if phase.fract() < 0.5 { 1.0 } else { -1.0 }
    }

    /// Opening jingle: two voices, melody over a bass line.
    fn gen_theme() -> Vec<f32> {
        // (melody Hz, bass Hz) per eighth note
        let notes: [(f32, f32); 16] = [
            (494.0, 123.0), (988.0, 123.0), (740.0, 247.0), (622.0, 247.0),
            (988.0, 123.0), (740.0, 123.0), (622.0, 247.0), (0.0, 247.0),
            (523.0, 131.0), (1047.0, 131.0), (784.0, 262.0), (659.0, 262.0),
            (1047.0, 131.0), (784.0, 131.0), (659.0, 262.0), (0.0, 262.0),
        ];
        let note_dur = 0.13;
        let mut samples = Vec::new();
        for &(melody, bass) in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.5;
                let m = if melody > 0.0 { square(t * melody) * 0.5 } else { 0.0 };
                let b = (t * bass * TAU).sin() * 0.5;
                samples.push((m + b) * env * 0.2);
            }
        }
        samples
    }

    /// Dot: a quick down-up sweep.
    fn gen_chomp() -> Vec<f32> {
        let duration = 0.11;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 200.0 + (2.0 * t - 1.0).abs() * 300.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = 1.0 - t * 0.6;
                (phase * TAU).sin() * env * 0.25
            })
            .collect()
    }

    /// Ghost eaten: fast rising sweep.
    fn gen_eat_ghost() -> Vec<f32> {
        let duration = 0.4;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 150.0 + t * t * 1400.0;
                phase += freq / SAMPLE_RATE as f32;
                let env = 1.0 - t.powf(3.0);
                square(phase) * env * 0.15
            })
            .collect()
    }

    /// Death: descending warble followed by two pops.
    fn gen_death() -> Vec<f32> {
        let mut samples = Vec::new();
        let mut phase = 0.0_f32;
        for step in 0..10 {
            let top = 800.0 - step as f32 * 60.0;
            let n = (SAMPLE_RATE as f32 * 0.12) as usize;
            for i in 0..n {
                let t = i as f32 / n as f32;
                let freq = top - t * 250.0;
                phase += freq / SAMPLE_RATE as f32;
                samples.push((phase * TAU).sin() * 0.25);
            }
        }
        for _ in 0..2 {
            let n = (SAMPLE_RATE as f32 * 0.08) as usize;
            for i in 0..n {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                samples.push((ti * (120.0 + t * 600.0) * TAU).sin() * (1.0 - t) * 0.3);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&gen_chomp());
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            let data = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
            assert_eq!(wav.len(), 44 + data as usize);
        }

        #[test]
        fn death_outlasts_chomp() {
            assert!(gen_death().len() > 10 * gen_chomp().len());
            assert!(gen_theme().iter().all(|s| s.abs() <= 1.0));
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Stub engine when sound is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
}

#[cfg(not(feature = "sound"))]
impl AudioSink for SoundEngine {
    fn play(&mut self, _cue: Cue, _interrupt_current: bool, _rate: f32) {}
    fn is_playing(&self) -> bool { false }
}

/// Output used when audio is disabled or unavailable.
pub struct Silence;

impl AudioSink for Silence {
    fn play(&mut self, _cue: Cue, _interrupt_current: bool, _rate: f32) {}
    fn is_playing(&self) -> bool { false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Who;

    #[derive(Default)]
    struct Recorder {
        played: Vec<(Cue, bool)>,
    }

    impl AudioSink for Recorder {
        fn play(&mut self, cue: Cue, interrupt_current: bool, _rate: f32) {
            self.played.push((cue, interrupt_current));
        }
        fn is_playing(&self) -> bool { false }
    }

    #[test]
    fn attract_mode_is_silent() {
        let events = [
            GameEvent::DotEaten { cx: 1, cy: 4, in_demo: true },
            GameEvent::GhostEaten { who: Who::Inky, points: 200, in_demo: true },
            GameEvent::PacmanDied { in_demo: true, game_over: false },
        ];
        let mut rec = Recorder::default();
        assert!(!play_events(&mut rec, &events));
        assert!(rec.played.is_empty());
    }

    #[test]
    fn player_cues() {
        let events = [
            GameEvent::GameStarted,
            GameEvent::PillEaten { cx: 1, cy: 6, in_demo: false },
            GameEvent::GhostEaten { who: Who::Binky, points: 200, in_demo: false },
            GameEvent::Paused,
            GameEvent::PacmanDied { in_demo: false, game_over: true },
        ];
        let mut rec = Recorder::default();
        assert!(play_events(&mut rec, &events));
        assert_eq!(
            rec.played,
            vec![(Cue::Theme, true), (Cue::Chomp, false), (Cue::EatGhost, true), (Cue::Death, true)]
        );
    }
}
