//! WAV fixtures for unit tests

use std::io::Cursor;

/// Encode 16-bit PCM samples (interleaved) as a WAV file in memory
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

/// Mono sine tone as 16-bit WAV bytes
pub fn sine_wav(freq_hz: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<u8> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let samples: Vec<i16> = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            ((2.0 * std::f32::consts::PI * freq_hz * t).sin() * amplitude * i16::MAX as f32) as i16
        })
        .collect();
    wav_bytes(sample_rate, 1, &samples)
}

/// Mono digital silence as 16-bit WAV bytes
pub fn silent_wav(sample_rate: u32, seconds: f32) -> Vec<u8> {
    let frames = (sample_rate as f32 * seconds) as usize;
    wav_bytes(sample_rate, 1, &vec![0; frames])
}

/// 24 silent MPEG-1 Layer III frames, mono, 44.1 kHz, 128 kbps
pub const SILENT_MP3: &[u8] = include_bytes!("../../fixtures/silence.mp3");

/// 20 silent AAC-LC frames in an MP4 container, mono, 44.1 kHz
pub const SILENT_M4A: &[u8] = include_bytes!("../../fixtures/silence.m4a");
