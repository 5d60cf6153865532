use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::sample::SampleEncoding;
use crate::audio::{
    AudioFile, AudioFileIo, ContainerType, Converter, CreateFlags, ResumeCapability, StreamDescription,
    WriteOutcome,
};
use crate::error::{ConvertError, Result, StatusCode};

/// Called after each non-empty source read with the 1-based read count.
pub type ReadHook = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Open,
    Create(StreamDescription),
    SetClientFormat { destination: bool },
    Read(u32),
    Write { frames: u32, outcome: WriteOutcome },
    Seek(u64),
    DisposeDestination,
    DisposeSource,
    DisposeConverter,
}

struct MockState {
    source_format: StreamDescription,
    source: Vec<i16>,
    write_script: VecDeque<WriteOutcome>,
    converter: Option<ResumeCapability>,
    converter_query_fails: bool,
    fail_open: bool,
    fail_create: bool,
    fail_destination_client_format: bool,
    read_hook: Option<ReadHook>,
    reads: usize,
    written: Vec<i16>,
    events: Vec<MockEvent>,
}

/// Scriptable in-memory audio backend. Clones share state.
#[derive(Clone)]
pub struct MockAudioIo {
    state: Arc<Mutex<MockState>>,
}

impl MockAudioIo {
    /// A source with `format` whose interleaved samples are `samples`.
    pub fn new(format: StreamDescription, samples: Vec<i16>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                source_format: format,
                source: samples,
                write_script: VecDeque::new(),
                converter: None,
                converter_query_fails: false,
                fail_open: false,
                fail_create: false,
                fail_destination_client_format: false,
                read_hook: None,
                reads: 0,
                written: Vec::new(),
                events: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Outcomes returned by successive writes; `Success` once exhausted.
    pub fn with_write_script<I: IntoIterator<Item = WriteOutcome>>(self, script: I) -> Self {
        self.state().write_script = script.into_iter().collect();
        self
    }

    /// Have the destination hand out a converter answering `capability`.
    pub fn with_converter(self, capability: ResumeCapability) -> Self {
        self.state().converter = Some(capability);
        self
    }

    pub fn with_failing_converter_query(self) -> Self {
        let mut state = self.state();
        state.converter = Some(ResumeCapability::CanResume);
        state.converter_query_fails = true;
        drop(state);
        self
    }

    pub fn fail_open(self) -> Self {
        self.state().fail_open = true;
        self
    }

    pub fn fail_create(self) -> Self {
        self.state().fail_create = true;
        self
    }

    pub fn fail_destination_client_format(self) -> Self {
        self.state().fail_destination_client_format = true;
        self
    }

    pub fn on_read<F>(self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.state().read_hook = Some(Arc::new(hook));
        self
    }

    /// Samples the destination accepted, in client order.
    pub fn written(&self) -> Vec<i16> {
        self.state().written.clone()
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state().events.clone()
    }

    pub fn write_attempts(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, MockEvent::Write { .. }))
            .count()
    }

    pub fn disposals(&self) -> Vec<MockEvent> {
        self.state()
            .events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    MockEvent::DisposeDestination | MockEvent::DisposeSource | MockEvent::DisposeConverter
                )
            })
            .cloned()
            .collect()
    }

    fn record(&self, event: MockEvent) {
        self.state().events.push(event);
    }
}

impl AudioFileIo for MockAudioIo {
    fn open(&self, _path: &Path) -> Result<Box<dyn AudioFile>> {
        if self.state().fail_open {
            return Err(ConvertError::setup_with_code("mock source missing", StatusCode(-43)));
        }
        self.record(MockEvent::Open);
        Ok(Box::new(MockSource { io: self.clone(), client: None, position: 0 }))
    }

    fn create(
        &self,
        _path: &Path,
        _container: ContainerType,
        format: &StreamDescription,
        _flags: CreateFlags,
    ) -> Result<Box<dyn AudioFile>> {
        if self.state().fail_create {
            return Err(ConvertError::setup("mock destination refused"));
        }
        self.record(MockEvent::Create(*format));
        Ok(Box::new(MockDestination { io: self.clone(), format: *format, client: None, converter_taken: false }))
    }
}

struct MockSource {
    io: MockAudioIo,
    client: Option<SampleEncoding>,
    position: usize,
}

impl AudioFile for MockSource {
    fn file_format(&self) -> Result<StreamDescription> {
        Ok(self.io.state().source_format)
    }

    fn set_client_format(&mut self, format: &StreamDescription) -> Result<()> {
        self.client = Some(SampleEncoding::for_client(format)?);
        self.io.record(MockEvent::SetClientFormat { destination: false });
        Ok(())
    }

    fn read(&mut self, max_frames: u32, buffer: &mut [u8]) -> Result<u32> {
        let encoding = self.client.ok_or_else(|| ConvertError::read("mock source has no client format"))?;
        let (frames, hook, reads) = {
            let mut state = self.io.state();
            let channels = state.source_format.channels as usize;
            let total_frames = state.source.len() / channels;
            let capacity = buffer.len() / (encoding.bytes_per_sample() * channels);
            let frames = (max_frames as usize).min(capacity).min(total_frames - self.position);

            let start = self.position * channels;
            let size = encoding.bytes_per_sample();
            for (i, &value) in state.source[start..start + frames * channels].iter().enumerate() {
                encoding.encode((value as i32) << 16, &mut buffer[i * size..(i + 1) * size]);
            }
            self.position += frames;
            state.events.push(MockEvent::Read(frames as u32));
            if frames > 0 {
                state.reads += 1;
            }
            (frames as u32, state.read_hook.clone(), state.reads)
        };

        if frames > 0 {
            if let Some(hook) = hook {
                hook(reads);
            }
        }
        Ok(frames)
    }

    fn write(&mut self, _frames: u32, _buffer: &[u8]) -> WriteOutcome {
        WriteOutcome::Failed(StatusCode::PARAM_ERR)
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let state = self.io.state();
        let total_frames = (state.source.len() / state.source_format.channels as usize) as u64;
        drop(state);
        if frame > total_frames {
            return Err(ConvertError::seek(format!("frame {} past end {}", frame, total_frames)));
        }
        self.position = frame as usize;
        self.io.record(MockEvent::Seek(frame));
        Ok(())
    }

    fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>> {
        Ok(None)
    }

    fn dispose(self: Box<Self>) {
        self.io.record(MockEvent::DisposeSource);
    }
}

struct MockDestination {
    io: MockAudioIo,
    format: StreamDescription,
    client: Option<(SampleEncoding, u32)>,
    converter_taken: bool,
}

impl AudioFile for MockDestination {
    fn file_format(&self) -> Result<StreamDescription> {
        Ok(self.format)
    }

    fn set_client_format(&mut self, format: &StreamDescription) -> Result<()> {
        if self.io.state().fail_destination_client_format {
            return Err(ConvertError::setup_with_code("mock client format rejected", StatusCode::PARAM_ERR));
        }
        self.client = Some((SampleEncoding::for_client(format)?, format.channels));
        self.io.record(MockEvent::SetClientFormat { destination: true });
        Ok(())
    }

    fn read(&mut self, _max_frames: u32, _buffer: &mut [u8]) -> Result<u32> {
        Err(ConvertError::read("mock destination is write-only"))
    }

    fn write(&mut self, frames: u32, buffer: &[u8]) -> WriteOutcome {
        let Some((encoding, channels)) = self.client else {
            return WriteOutcome::Failed(StatusCode::PARAM_ERR);
        };
        let mut state = self.io.state();
        let outcome = state.write_script.pop_front().unwrap_or(WriteOutcome::Success);
        if matches!(outcome, WriteOutcome::Success | WriteOutcome::CodecUnavailableInputConsumed) {
            let len = frames as usize * channels as usize * encoding.bytes_per_sample();
            let mut samples = Vec::new();
            encoding.decode_all(&buffer[..len], &mut samples);
            state.written.extend(samples.into_iter().map(|full| (full >> 16) as i16));
        }
        state.events.push(MockEvent::Write { frames, outcome });
        outcome
    }

    fn seek(&mut self, _frame: u64) -> Result<()> {
        Err(ConvertError::seek("mock destination cannot seek"))
    }

    fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>> {
        if self.converter_taken {
            return Ok(None);
        }
        self.converter_taken = true;
        let state = self.io.state();
        Ok(state.converter.map(|capability| {
            Box::new(MockConverter {
                io: self.io.clone(),
                capability,
                query_fails: state.converter_query_fails,
            }) as Box<dyn Converter>
        }))
    }

    fn dispose(self: Box<Self>) {
        self.io.record(MockEvent::DisposeDestination);
    }
}

struct MockConverter {
    io: MockAudioIo,
    capability: ResumeCapability,
    query_fails: bool,
}

impl Converter for MockConverter {
    fn can_resume(&self) -> Result<ResumeCapability> {
        if self.query_fails {
            return Err(ConvertError::setup_with_code("mock converter query failed", StatusCode::PARAM_ERR));
        }
        Ok(self.capability)
    }

    fn dispose(self: Box<Self>) {
        self.io.record(MockEvent::DisposeConverter);
    }
}
