//! Audio Bridge: fetch + decode into device-ready PCM, plus streaming media
//! elements.
//!
//! The decode pipeline is independent of the Asset Cache: it fetches
//! `assets/<path>` on its own and decodes through the host facilities (WAV
//! via `hound`, QOA via `qoaudio`) into interleaved stereo `i16` buffers.
//! Decoded buffers and media elements live in a registry keyed by nonzero
//! handles; playback pushes samples into the embedder's [`AudioSink`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::abi::err_code;
use crate::assets::{AssetFetcher, FetchError, fetch_asset};
use crate::completion::Completion;

/// Device-ready decoded audio: interleaved stereo `i16`.
///
/// Mono sources are duplicated to stereo at decode time so every buffer in
/// the registry has the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    /// Interleaved stereo samples (L0, R0, L1, R1, ...).
    pub samples: Vec<i16>,
}

impl PcmBuffer {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized audio container (expected WAV or QOA)")]
    UnrecognizedFormat,
    #[error("WAV decode failed: {0}")]
    Wav(String),
    #[error("QOA decode failed: {0}")]
    Qoa(String),
    #[error("unsupported channel count {0}")]
    UnsupportedChannels(u32),
}

/// Failure of any stage of the buffer pipeline; fetch and decode report
/// through the same callback channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl AudioError {
    pub fn code(&self) -> u32 {
        match self {
            AudioError::Fetch(e) => e.code(),
            AudioError::Decode(_) => err_code::DECODE,
        }
    }
}

/// Output seam for fire-and-forget playback.
///
/// Intentionally small so the device side can be bridged to different
/// backends: an in-memory buffer in unit tests, a real output stream in
/// embeddings.
pub trait AudioSink: Send {
    /// Push interleaved stereo `i16` samples.
    fn push_interleaved(&mut self, samples: &[i16]);
}

/// Sink that drops everything; the default for embeddings without audio out.
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn push_interleaved(&mut self, _samples: &[i16]) {}
}

/// Decode sniffed bytes into PCM. Container detection is by magic: RIFF/WAVE
/// or `qoaf`.
pub fn decode_pcm(bytes: &[u8]) -> Result<PcmBuffer, DecodeError> {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return decode_wav(bytes);
    }
    if bytes.len() >= 4 && &bytes[0..4] == b"qoaf" {
        return decode_qoa(bytes);
    }
    Err(DecodeError::UnrecognizedFormat)
}

fn decode_wav(bytes: &[u8]) -> Result<PcmBuffer, DecodeError> {
    let cursor = std::io::Cursor::new(bytes);
    let reader = hound::WavReader::new(cursor).map_err(|e| DecodeError::Wav(e.to_string()))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let mut samples: Vec<i16> = Vec::new();
    for sample in reader.into_samples::<i16>() {
        samples.push(sample.map_err(|e| DecodeError::Wav(e.to_string()))?);
    }

    let samples = widen_to_stereo(samples, spec.channels as u32)?;
    Ok(PcmBuffer {
        sample_rate,
        samples,
    })
}

fn decode_qoa(bytes: &[u8]) -> Result<PcmBuffer, DecodeError> {
    let decoder = qoaudio::QoaDecoder::new(bytes).map_err(|e| DecodeError::Qoa(format!("{e:?}")))?;

    let channels = decoder.channels() as u32;
    let sample_rate = decoder.sample_rate() as u32;
    let samples: Vec<i16> = match decoder.decoded_samples() {
        Some(s) => s.into_iter().collect(),
        None => return Err(DecodeError::Qoa("no decoded samples".into())),
    };

    let samples = widen_to_stereo(samples, channels)?;
    Ok(PcmBuffer {
        sample_rate,
        samples,
    })
}

fn widen_to_stereo(samples: Vec<i16>, channels: u32) -> Result<Vec<i16>, DecodeError> {
    match channels {
        1 => Ok(samples.into_iter().flat_map(|s| [s, s]).collect()),
        2 => Ok(samples),
        other => Err(DecodeError::UnsupportedChannels(other)),
    }
}

/// A streaming media element plus its derived audio-graph source node.
///
/// Both handles stay registered for the life of the bridge; there is no
/// teardown path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAudio {
    pub path: String,
    pub element: u32,
    pub source_node: u32,
}

/// Pack the media handles the way the ABI returns them.
pub fn pack_media_handles(element: u32, source_node: u32) -> u64 {
    ((element as u64) << 32) | (source_node as u64)
}

/// Host-side audio state: decoded buffers, media elements, and the sink.
pub struct AudioRegistry {
    buffers: HashMap<u32, PcmBuffer>,
    media: HashMap<u32, MediaAudio>,
    next_handle: u32,
    sink: Box<dyn AudioSink>,
}

impl AudioRegistry {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            buffers: HashMap::new(),
            media: HashMap::new(),
            // Handle 0 is the error sentinel in completion callbacks.
            next_handle: 1,
            sink,
        }
    }

    fn alloc_handle(&mut self) -> u32 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    /// Register a decoded buffer and return its handle.
    pub fn insert_buffer(&mut self, buffer: PcmBuffer) -> u32 {
        let handle = self.alloc_handle();
        self.buffers.insert(handle, buffer);
        handle
    }

    pub fn buffer(&self, handle: u32) -> Option<&PcmBuffer> {
        self.buffers.get(&handle)
    }

    /// Create a streaming media element for `assets/<path>` and attach it.
    /// Synchronous; returns the element and source-node handles.
    pub fn create_media(&mut self, path: String) -> (u32, u32) {
        let element = self.alloc_handle();
        let source_node = self.alloc_handle();
        self.media.insert(
            element,
            MediaAudio {
                path,
                element,
                source_node,
            },
        );
        (element, source_node)
    }

    pub fn media(&self, element: u32) -> Option<&MediaAudio> {
        self.media.get(&element)
    }

    /// Fire-and-forget playback: push the whole buffer into the sink.
    /// Unknown handles do nothing; callers report them to the error sink.
    pub fn play(&mut self, handle: u32) -> bool {
        match self.buffers.get(&handle) {
            Some(buffer) => {
                self.sink.push_interleaved(&buffer.samples);
                true
            }
            None => false,
        }
    }
}

/// Kick off the fetch + decode pipeline on the shared runtime. Never touches
/// the Asset Cache.
pub fn spawn_buffer_request(
    fetcher: Arc<dyn AssetFetcher>,
    tx: mpsc::UnboundedSender<Completion>,
    path: String,
    request_id: u32,
) {
    crate::rt::spawn(async move {
        let result = match fetch_asset(fetcher.as_ref(), &path).await {
            Ok(bytes) => decode_pcm(&bytes).map_err(AudioError::from),
            Err(e) => Err(AudioError::from(e)),
        };
        let _ = tx.send(Completion::AudioBuffer {
            request_id,
            path,
            result,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn stereo_wav_decodes_verbatim() {
        let bytes = wav_bytes(2, &[100, -100, 200, -200]);
        let pcm = decode_pcm(&bytes).unwrap();
        assert_eq!(pcm.sample_rate, 44_100);
        assert_eq!(pcm.samples, vec![100, -100, 200, -200]);
        assert_eq!(pcm.frames(), 2);
    }

    #[test]
    fn mono_wav_duplicates_to_stereo() {
        let bytes = wav_bytes(1, &[5000, -5000]);
        let pcm = decode_pcm(&bytes).unwrap();
        assert_eq!(pcm.samples, vec![5000, 5000, -5000, -5000]);
    }

    #[test]
    fn garbage_bytes_are_unrecognized() {
        assert_eq!(
            decode_pcm(b"definitely not audio"),
            Err(DecodeError::UnrecognizedFormat)
        );
    }

    #[test]
    fn truncated_riff_is_a_wav_error() {
        let mut bytes = wav_bytes(2, &[1, 2]);
        bytes.truncate(16);
        assert!(matches!(decode_pcm(&bytes), Err(DecodeError::Wav(_))));
    }

    #[test]
    fn audio_error_codes_distinguish_fetch_and_decode() {
        let fetch = AudioError::from(FetchError::NotFound);
        let decode = AudioError::from(DecodeError::UnrecognizedFormat);
        assert_eq!(fetch.code(), err_code::NOT_FOUND);
        assert_eq!(decode.code(), err_code::DECODE);
    }

    /// Sink that remembers what was pushed.
    #[derive(Default)]
    struct MemorySink(std::sync::Arc<std::sync::Mutex<Vec<i16>>>);

    impl AudioSink for MemorySink {
        fn push_interleaved(&mut self, samples: &[i16]) {
            self.0.lock().unwrap().extend_from_slice(samples);
        }
    }

    #[test]
    fn registry_handles_are_nonzero_and_distinct() {
        let mut reg = AudioRegistry::new(Box::new(NullSink));
        let a = reg.insert_buffer(PcmBuffer {
            sample_rate: 44_100,
            samples: vec![],
        });
        let (element, source) = reg.create_media("music/loop.wav".into());

        assert!(a != 0 && element != 0 && source != 0);
        assert!(a != element && element != source);
        assert_eq!(reg.media(element).unwrap().path, "music/loop.wav");
        assert_eq!(reg.media(element).unwrap().source_node, source);
    }

    #[test]
    fn pack_media_handles_round_trips() {
        let packed = pack_media_handles(3, 4);
        assert_eq!(packed >> 32, 3);
        assert_eq!(packed & 0xFFFF_FFFF, 4);
    }

    #[test]
    fn play_pushes_buffer_into_sink() {
        let sink = MemorySink::default();
        let pushed = sink.0.clone();
        let mut reg = AudioRegistry::new(Box::new(sink));

        let handle = reg.insert_buffer(PcmBuffer {
            sample_rate: 44_100,
            samples: vec![1, 2, 3, 4],
        });

        assert!(reg.play(handle));
        assert_eq!(*pushed.lock().unwrap(), vec![1, 2, 3, 4]);

        // Handles stay valid for repeated plays.
        assert!(reg.play(handle));
        assert_eq!(pushed.lock().unwrap().len(), 8);
    }

    #[test]
    fn play_unknown_handle_is_a_noop() {
        let sink = MemorySink::default();
        let pushed = sink.0.clone();
        let mut reg = AudioRegistry::new(Box::new(sink));

        assert!(!reg.play(42));
        assert!(pushed.lock().unwrap().is_empty());
    }
}
