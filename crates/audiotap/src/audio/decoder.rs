//! Audio decoder using Symphonia
//!
//! Decodes a complete encoded file (MP3, WAV, MP4/AAC) held in memory into a
//! [`DecodedBuffer`]. No resampling or normalization is applied.

use std::io::Cursor;

use crossbeam_channel::Receiver;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{Result, TapError};

use super::buffer::DecodedBuffer;

/// Convert a symphonia codec type to a human-readable name
pub fn codec_type_to_name(codec: symphonia::core::codecs::CodecType) -> String {
    use symphonia::core::codecs::*;
    match codec {
        CODEC_TYPE_AAC => "AAC".to_string(),
        CODEC_TYPE_MP3 => "MP3".to_string(),
        CODEC_TYPE_MP2 => "MP2".to_string(),
        CODEC_TYPE_MP1 => "MP1".to_string(),
        CODEC_TYPE_PCM_U8 => "PCM 8-bit".to_string(),
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM 16-bit".to_string(),
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM 24-bit".to_string(),
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM 32-bit".to_string(),
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM 32-bit Float".to_string(),
        CODEC_TYPE_PCM_F64LE | CODEC_TYPE_PCM_F64BE => "PCM 64-bit Float".to_string(),
        CODEC_TYPE_PCM_ALAW => "PCM A-law".to_string(),
        CODEC_TYPE_PCM_MULAW => "PCM u-law".to_string(),
        _ => "Audio".to_string(),
    }
}

/// Map a MIME type to the extension hint symphonia uses for format detection
pub fn hint_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "audio/mpeg" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mp4" => Some("m4a"),
        _ => None,
    }
}

/// Decode a whole encoded file into PCM.
///
/// Blocks for as long as the codec takes. Use [`start_decode`] to run it off
/// the calling thread.
pub fn decode(bytes: Vec<u8>, format_hint: Option<&str>) -> Result<DecodedBuffer> {
    if bytes.is_empty() {
        return Err(TapError::Decode("Empty input".to_string()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = format_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TapError::Decode(format!("Probe error: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TapError::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let codec_name = codec_type_to_name(codec_params.codec);
    let bits_per_sample = codec_params.bits_per_sample;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| TapError::Decode(format!("Decoder creation error: {}", e)))?;

    let mut channels: Option<u16> = None;
    let mut sample_rate = codec_params.sample_rate;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut frames_decoded: u64 = 0;
    let mut decode_errors: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(TapError::Decode(format!("Read error: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let frame_channels = spec.channels.count() as u16;

                // Interleaving only holds while the layout is stable
                match channels {
                    Some(c) if c != frame_channels => {
                        return Err(TapError::Decode(format!(
                            "Channel count changed mid-stream ({} -> {})",
                            c, frame_channels
                        )));
                    }
                    _ => channels = Some(frame_channels),
                }
                // Decoder output wins over the container header
                sample_rate = Some(spec.rate);

                // SampleBuffer capacity counts samples, decoder capacity counts frames
                let capacity = decoded.capacity();
                let needed = capacity * frame_channels as usize;
                if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                    sample_buf = Some(SampleBuffer::new(capacity as u64, spec));
                }
                if let Some(ref mut buf) = sample_buf {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                frames_decoded += 1;
            }
            Err(SymphoniaError::DecodeError(e)) => {
                decode_errors += 1;
                warn!(error = %e, "skipping undecodable packet");
            }
            Err(e) => return Err(TapError::Decode(format!("Decode failed: {}", e))),
        }
    }

    let (channels, sample_rate) = match (channels, sample_rate) {
        (Some(c), Some(r)) if frames_decoded > 0 && !samples.is_empty() => (c, r),
        _ => {
            return Err(TapError::Decode(format!(
                "No audio frames decoded ({} packet errors)",
                decode_errors
            )))
        }
    };

    debug!(
        codec = %codec_name,
        channels,
        sample_rate,
        frames_decoded,
        decode_errors,
        "decode complete"
    );

    Ok(DecodedBuffer::new(channels, sample_rate, samples)?.with_codec(codec_name, bits_per_sample))
}

/// Spawn a decode thread and return the receiver immediately (non-blocking).
///
/// The decode runs on a background `"audio-decode"` thread. The caller can
/// poll the returned `Receiver` with `try_recv()` or block with `recv_timeout()`.
/// Dropping the receiver discards the result when it arrives.
pub fn start_decode(
    bytes: Vec<u8>,
    format_hint: Option<String>,
) -> Result<Receiver<Result<DecodedBuffer>>> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name("audio-decode".to_string())
        .spawn(move || {
            let result = decode(bytes, format_hint.as_deref());
            let _ = tx.send(result);
        })
        .map_err(|e| TapError::Audio(format!("Failed to spawn decode thread: {}", e)))?;

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_util::{sine_wav, wav_bytes, SILENT_M4A, SILENT_MP3};
    use std::time::Duration;

    // --- Basic decoding ---

    #[test]
    fn decode_wav_mono() {
        let samples: Vec<i16> = (0..1000).map(|i| (i % 100 * 100) as i16).collect();
        let buf = decode(wav_bytes(44100, 1, &samples), None).unwrap();

        assert_eq!(buf.channels(), 1);
        assert_eq!(buf.sample_rate(), 44100);
        assert_eq!(buf.frames(), 1000);
    }

    #[test]
    fn decode_wav_stereo_preserves_interleaving() {
        // Left channel positive, right channel negative
        let samples: Vec<i16> = (0..2000)
            .map(|i| if i % 2 == 0 { 8000 } else { -8000 })
            .collect();
        let buf = decode(wav_bytes(48000, 2, &samples), None).unwrap();

        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.sample_rate(), 48000);
        assert_eq!(buf.frames(), 1000);
        for frame in buf.samples().chunks(2) {
            assert!(frame[0] > 0.0);
            assert!(frame[1] < 0.0);
        }
    }

    #[test]
    fn no_resampling_at_unusual_rates() {
        for rate in [8000, 22050, 96000] {
            let buf = decode(wav_bytes(rate, 1, &[100; 400]), None).unwrap();
            assert_eq!(buf.sample_rate(), rate);
            assert_eq!(buf.frames(), 400);
        }
    }

    #[test]
    fn samples_are_in_valid_range() {
        let buf = decode(sine_wav(440.0, 44100, 0.1, 0.9), None).unwrap();
        assert!(buf.samples().iter().all(|&s| (-1.0..=1.0).contains(&s)));
        assert!(buf.samples().iter().any(|&s| s.abs() > 0.5));
    }

    #[test]
    fn full_scale_samples_stay_full_scale() {
        let buf = decode(wav_bytes(44100, 1, &[i16::MIN; 100]), None).unwrap();
        assert!(buf.samples().iter().all(|&s| s < -0.9));
    }

    #[test]
    fn duration_matches_frame_count() {
        let buf = decode(sine_wav(220.0, 44100, 1.0, 0.5), None).unwrap();
        let secs = buf.duration().as_secs_f64();
        assert!((secs - 1.0).abs() < 0.01, "duration was {}", secs);
    }

    #[test]
    fn codec_info_for_wav() {
        let buf = decode(wav_bytes(44100, 2, &[0; 200]), Some("wav")).unwrap();
        let info = buf.codec_info();
        assert_eq!(info.channels, 2);
        assert_eq!(info.sample_rate, 44100);
        assert!(
            info.codec_name.contains("PCM"),
            "Unexpected codec name for WAV: {}",
            info.codec_name
        );
        if let Some(bps) = info.bits_per_sample {
            assert_eq!(bps, 16);
        }
    }

    #[test]
    fn wrong_hint_still_decodes_wav() {
        // Without a hint, symphonia sniffs the content
        let result = decode(wav_bytes(44100, 1, &[0; 100]), Some("mp3"));
        if let Ok(buf) = result {
            assert_eq!(buf.channels(), 1);
        }
    }

    // --- Compressed formats ---

    #[test]
    fn decode_mp3() {
        let buf = decode(SILENT_MP3.to_vec(), hint_for_mime("audio/mpeg")).unwrap();
        assert_eq!(buf.codec_info().codec_name, "MP3");
        assert_eq!(buf.channels(), 1);
        assert_eq!(buf.sample_rate(), 44100);
        assert!(buf.frames() >= 1152, "only {} frames", buf.frames());
        assert!(buf.samples().iter().all(|s| s.abs() < 0.01));
    }

    #[test]
    fn decode_mp3_without_hint() {
        let buf = decode(SILENT_MP3.to_vec(), None).unwrap();
        assert_eq!(buf.codec_info().codec_name, "MP3");
    }

    #[test]
    fn decode_m4a_through_mime_hint() {
        let hint = hint_for_mime("audio/mp4");
        assert_eq!(hint, Some("m4a"));

        let buf = decode(SILENT_M4A.to_vec(), hint).unwrap();
        assert_eq!(buf.codec_info().codec_name, "AAC");
        assert_eq!(buf.channels(), 1);
        assert_eq!(buf.sample_rate(), 44100);
        assert!(buf.frames() >= 1024, "only {} frames", buf.frames());
    }

    #[test]
    fn truncated_mp4_fails() {
        let result = decode(SILENT_M4A[..64].to_vec(), Some("m4a"));
        assert!(matches!(result, Err(TapError::Decode(_))));
    }

    // --- codec_type_to_name / hint_for_mime ---

    #[test]
    fn codec_name_lookup() {
        use symphonia::core::codecs::*;
        assert_eq!(codec_type_to_name(CODEC_TYPE_MP3), "MP3");
        assert_eq!(codec_type_to_name(CODEC_TYPE_AAC), "AAC");
        assert_eq!(codec_type_to_name(CODEC_TYPE_PCM_S16LE), "PCM 16-bit");
        assert_eq!(codec_type_to_name(CODEC_TYPE_PCM_F32LE), "PCM 32-bit Float");
        assert_eq!(codec_type_to_name(CODEC_TYPE_NULL), "Audio");
    }

    #[test]
    fn mime_hints() {
        assert_eq!(hint_for_mime("audio/mpeg"), Some("mp3"));
        assert_eq!(hint_for_mime("audio/wav"), Some("wav"));
        assert_eq!(hint_for_mime("audio/mp4"), Some("m4a"));
        assert_eq!(hint_for_mime("video/mp4"), None);
    }

    // --- Error paths ---

    #[test]
    fn error_on_empty_data() {
        assert!(matches!(decode(Vec::new(), None), Err(TapError::Decode(_))));
    }

    #[test]
    fn error_on_zeroed_data() {
        match decode(vec![0u8; 100], None) {
            Err(TapError::Decode(msg)) => assert!(!msg.is_empty()),
            other => panic!("Expected decode error, got {:?}", other.map(|b| b.frames())),
        }
    }

    #[test]
    fn error_on_truncated_wav_header() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&100u32.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        assert!(decode(buf, None).is_err());
    }

    #[test]
    fn error_on_wav_without_samples() {
        assert!(decode(wav_bytes(44100, 1, &[]), None).is_err());
    }

    #[test]
    fn error_on_random_bytes() {
        let random_data: Vec<u8> = (0..1024).map(|i| (i * 7 % 256) as u8).collect();
        assert!(decode(random_data, None).is_err());
    }

    #[test]
    fn repeated_failures_are_independent() {
        for _ in 0..20 {
            assert!(decode(vec![0u8; 50], None).is_err());
        }
        assert!(decode(wav_bytes(44100, 1, &[1; 10]), None).is_ok());
    }

    // --- Background decode ---

    #[test]
    fn start_decode_delivers_buffer() {
        let rx = start_decode(sine_wav(440.0, 44100, 0.2, 0.5), Some("wav".to_string())).unwrap();
        let buf = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(buf.channels(), 1);
    }

    #[test]
    fn start_decode_delivers_error() {
        let rx = start_decode(vec![0xFF; 10], None).unwrap();
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn start_decode_tolerates_dropped_receiver() {
        let rx = start_decode(sine_wav(440.0, 44100, 0.1, 0.5), None).unwrap();
        drop(rx);
        // The decode thread's send fails quietly; a fresh decode still works
        let rx = start_decode(sine_wav(440.0, 44100, 0.1, 0.5), None).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(10)).unwrap().is_ok());
    }
}
