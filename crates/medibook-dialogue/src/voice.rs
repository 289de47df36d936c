//! Streaming voice input.
//!
//! Clients send raw 16-bit little-endian PCM frames of arbitrary size.
//! [`VoiceBuffer`] collects them into fixed-size chunks and a
//! [`Transcriber`] turns each chunk into text for the dialogue session.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::DialogueError;

/// Speech-to-text engine.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Engine or model name, for capability reporting.
    fn model(&self) -> &str;

    /// Transcribe mono samples normalised to `[-1.0, 1.0)`.
    async fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, DialogueError>;
}

/// Accumulates PCM bytes and releases them in chunks of a fixed size.
#[derive(Debug)]
pub struct VoiceBuffer {
    buffer: Vec<u8>,
    chunk_size: usize,
}

impl VoiceBuffer {
    /// A zero chunk size is bumped to 2 bytes (one sample).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(chunk_size),
            chunk_size: chunk_size.max(2),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Remove and return one full chunk, if enough audio is buffered.
    pub fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if self.buffer.len() < self.chunk_size {
            return None;
        }
        let rest = self.buffer.split_off(self.chunk_size);
        Some(std::mem::replace(&mut self.buffer, rest))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Convert little-endian signed 16-bit PCM to `f32` samples.
///
/// A trailing odd byte is ignored.
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Transcriber that returns queued transcripts, for tests.
pub struct ScriptedTranscriber {
    transcripts: Mutex<VecDeque<String>>,
}

impl ScriptedTranscriber {
    pub fn new(transcripts: Vec<&str>) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.into_iter().map(str::to_string).collect()),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<String, DialogueError> {
        self.transcripts
            .lock()
            .map_err(|_| DialogueError::Voice("transcript queue poisoned".to_string()))
            .map(|mut queue| queue.pop_front().unwrap_or_default())
    }
}
