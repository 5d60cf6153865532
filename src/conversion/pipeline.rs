//! Read -> wait-if-paused -> write conversion loop

use std::fmt;

use log::{debug, trace, warn};

use crate::audio::AudioFile;
use crate::conversion::{BufferPool, Classification, ErrorClassifier, InterruptionController};
use crate::error::{ConvertError, Result};

/// Frame offset into the source stream, in client frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamPosition(u64);

impl StreamPosition {
    pub fn frames(self) -> u64 {
        self.0
    }

    pub fn advance(&mut self, frames: u32) {
        self.0 += frames as u64;
    }

    pub fn rewind(&mut self, frames: u32) {
        debug_assert!(self.0 >= frames as u64, "rewind past the start of the stream");
        self.0 = self.0.saturating_sub(frames as u64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Reading,
    Classifying,
    Writing,
    Seeking,
    Finished,
    Aborted,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Counters gathered while the loop runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub cycles: u64,
    pub frames_read: u64,
    /// Frames handed to the destination and accepted.
    pub frames_written: u64,
    /// `wait_if_paused` calls that observed a pause.
    pub interruptions: u64,
    pub resubmits: u64,
    pub advances: u64,
}

pub struct ConversionLoop<'a> {
    source: &'a mut dyn AudioFile,
    destination: &'a mut dyn AudioFile,
    buffer: &'a mut BufferPool,
    controller: &'a InterruptionController,
    classifier: ErrorClassifier,
    client_bytes_per_frame: u32,
    frames_per_cycle: u32,
    position: StreamPosition,
    phase: LoopPhase,
    report: LoopReport,
}

impl<'a> ConversionLoop<'a> {
    /// Panics if `client_bytes_per_frame` is 0 or the buffer cannot hold a frame.
    pub fn new(
        source: &'a mut dyn AudioFile,
        destination: &'a mut dyn AudioFile,
        buffer: &'a mut BufferPool,
        controller: &'a InterruptionController,
        classifier: ErrorClassifier,
        client_bytes_per_frame: u32,
    ) -> Self {
        assert!(client_bytes_per_frame > 0, "client format must have a fixed frame size");
        let frames_per_cycle = buffer.frames_for(client_bytes_per_frame);
        assert!(frames_per_cycle > 0, "buffer cannot hold a single client frame");

        Self {
            source,
            destination,
            buffer,
            controller,
            classifier,
            client_bytes_per_frame,
            frames_per_cycle,
            position: StreamPosition::default(),
            phase: LoopPhase::Idle,
            report: LoopReport::default(),
        }
    }

    pub fn position(&self) -> StreamPosition {
        self.position
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    fn enter(&mut self, phase: LoopPhase) {
        trace!("Loop phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs until the source is exhausted or a fatal error occurs.
    pub fn run(mut self) -> Result<LoopReport> {
        debug!(
            "Converting in cycles of {} frames ({} bytes per frame)",
            self.frames_per_cycle, self.client_bytes_per_frame
        );

        // a transient write failure on the previous cycle counts as an interruption
        let mut pending_codec_failure = false;

        loop {
            self.enter(LoopPhase::Reading);
            let frames = match self.source.read(self.frames_per_cycle, self.buffer.as_mut_slice()) {
                Ok(frames) => frames,
                Err(e) => {
                    self.enter(LoopPhase::Aborted);
                    return Err(Self::read_failure(e));
                }
            };
            if frames == 0 {
                self.enter(LoopPhase::Finished);
                debug!("Source exhausted after {} cycles", self.report.cycles);
                return Ok(self.report);
            }
            self.report.cycles += 1;
            self.report.frames_read += frames as u64;
            self.position.advance(frames);

            let was_interrupted = self.controller.wait_if_paused();
            if was_interrupted {
                self.report.interruptions += 1;
            }

            self.enter(LoopPhase::Classifying);
            let interrupted = was_interrupted || pending_codec_failure;
            let classification = {
                let destination = &mut *self.destination;
                let data = self.buffer.filled(frames, self.client_bytes_per_frame);
                let phase = &mut self.phase;
                self.classifier.classify(interrupted, || {
                    *phase = LoopPhase::Writing;
                    destination.write(frames, data)
                })
            };
            pending_codec_failure = classification.is_transient();

            match classification {
                Classification::Success => {
                    self.report.frames_written += frames as u64;
                }
                Classification::RetryableAdvance => {
                    self.report.frames_written += frames as u64;
                    self.report.advances += 1;
                }
                Classification::RetryableResubmit => {
                    self.report.resubmits += 1;
                    self.enter(LoopPhase::Seeking);
                    self.position.rewind(frames);
                    warn!("Rewinding source to frame {} to resubmit {} frames", self.position.frames(), frames);
                    if let Err(e) = self.source.seek(self.position.frames()) {
                        self.enter(LoopPhase::Aborted);
                        return Err(match e {
                            ConvertError::Seek { .. } => e,
                            other => ConvertError::seek(other.to_string()),
                        });
                    }
                }
                Classification::Fatal(e) => {
                    self.enter(LoopPhase::Aborted);
                    return Err(e);
                }
            }
            self.enter(LoopPhase::Idle);
        }
    }

    fn read_failure(e: ConvertError) -> ConvertError {
        match e {
            ConvertError::Read { .. } => e,
            other => ConvertError::read(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Converter, StreamDescription, WriteOutcome};
    use crate::error::StatusCode;
    use std::collections::VecDeque;

    /// Mono 16-bit stream whose sample at frame `i` is `i`.
    struct RampSource {
        frames: u64,
        position: u64,
        seeks: Vec<u64>,
    }

    impl AudioFile for RampSource {
        fn file_format(&self) -> Result<StreamDescription> {
            Ok(StreamDescription::linear_pcm(8000.0, 1, 16))
        }
        fn set_client_format(&mut self, _format: &StreamDescription) -> Result<()> {
            Ok(())
        }
        fn read(&mut self, max_frames: u32, buffer: &mut [u8]) -> Result<u32> {
            let frames = (max_frames as u64).min(self.frames - self.position) as u32;
            for i in 0..frames as usize {
                let value = (self.position + i as u64) as i16;
                buffer[i * 2..i * 2 + 2].copy_from_slice(&value.to_ne_bytes());
            }
            self.position += frames as u64;
            Ok(frames)
        }
        fn write(&mut self, _frames: u32, _buffer: &[u8]) -> WriteOutcome {
            WriteOutcome::Failed(StatusCode::PARAM_ERR)
        }
        fn seek(&mut self, frame: u64) -> Result<()> {
            self.seeks.push(frame);
            self.position = frame;
            Ok(())
        }
        fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct ScriptedSink {
        script: VecDeque<WriteOutcome>,
        samples: Vec<i16>,
        attempts: usize,
    }

    impl AudioFile for ScriptedSink {
        fn file_format(&self) -> Result<StreamDescription> {
            Ok(StreamDescription::linear_pcm(8000.0, 1, 16))
        }
        fn set_client_format(&mut self, _format: &StreamDescription) -> Result<()> {
            Ok(())
        }
        fn read(&mut self, _max_frames: u32, _buffer: &mut [u8]) -> Result<u32> {
            Ok(0)
        }
        fn write(&mut self, frames: u32, buffer: &[u8]) -> WriteOutcome {
            self.attempts += 1;
            let outcome = self.script.pop_front().unwrap_or(WriteOutcome::Success);
            if matches!(outcome, WriteOutcome::Success | WriteOutcome::CodecUnavailableInputConsumed) {
                self.samples.extend(
                    buffer[..frames as usize * 2].chunks_exact(2).map(|b| i16::from_ne_bytes([b[0], b[1]])),
                );
            }
            outcome
        }
        fn seek(&mut self, _frame: u64) -> Result<()> {
            Ok(())
        }
        fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>> {
            Ok(None)
        }
    }

    fn run_loop(
        source: &mut RampSource,
        sink: &mut ScriptedSink,
        can_resume: bool,
        buffer_bytes: usize,
    ) -> Result<LoopReport> {
        let controller = InterruptionController::new();
        controller.mark_running();
        let mut buffer = BufferPool::new(buffer_bytes);
        ConversionLoop::new(source, sink, &mut buffer, &controller, ErrorClassifier::new(can_resume), 2).run()
    }

    #[test]
    fn test_copies_whole_stream() {
        let mut source = RampSource { frames: 1000, position: 0, seeks: vec![] };
        let mut sink = ScriptedSink::default();
        let report = run_loop(&mut source, &mut sink, true, 64).unwrap();

        assert_eq!(report.frames_written, 1000);
        assert_eq!(report.cycles, 32);
        assert_eq!(sink.samples, (0..1000).map(|i| i as i16).collect::<Vec<_>>());
    }

    #[test]
    fn test_resubmit_rereads_same_frames() {
        let mut source = RampSource { frames: 100, position: 0, seeks: vec![] };
        let mut sink = ScriptedSink {
            script: VecDeque::from(vec![
                WriteOutcome::Success,
                WriteOutcome::CodecUnavailableInputNotConsumed,
                WriteOutcome::CodecUnavailableInputNotConsumed,
                WriteOutcome::Success,
            ]),
            ..Default::default()
        };
        let report = run_loop(&mut source, &mut sink, true, 20).unwrap();

        assert_eq!(source.seeks, vec![10, 10]);
        assert_eq!(report.resubmits, 2);
        assert_eq!(report.frames_written, 100);
        assert_eq!(report.frames_read, 120);
        assert_eq!(sink.samples, (0..100).map(|i| i as i16).collect::<Vec<_>>());
    }

    #[test]
    fn test_advance_does_not_rewind() {
        let mut source = RampSource { frames: 30, position: 0, seeks: vec![] };
        let mut sink = ScriptedSink {
            script: VecDeque::from(vec![WriteOutcome::CodecUnavailableInputConsumed]),
            ..Default::default()
        };
        let report = run_loop(&mut source, &mut sink, true, 20).unwrap();

        assert!(source.seeks.is_empty());
        assert_eq!(report.advances, 1);
        assert_eq!(sink.samples.len(), 30);
    }

    #[test]
    fn test_codec_failure_is_fatal_when_converter_cannot_resume() {
        let mut source = RampSource { frames: 100, position: 0, seeks: vec![] };
        let mut sink = ScriptedSink {
            script: VecDeque::from(vec![WriteOutcome::CodecUnavailableInputConsumed]),
            ..Default::default()
        };
        let err = run_loop(&mut source, &mut sink, false, 20).unwrap_err();

        assert_eq!(err, ConvertError::cannot_resume());
        assert_eq!(sink.attempts, 1);
    }

    #[test]
    fn test_fatal_write_stops_loop() {
        let mut source = RampSource { frames: 100, position: 0, seeks: vec![] };
        let mut sink = ScriptedSink {
            script: VecDeque::from(vec![WriteOutcome::Success, WriteOutcome::Failed(StatusCode(-36))]),
            ..Default::default()
        };
        let err = run_loop(&mut source, &mut sink, true, 20).unwrap_err();

        assert!(matches!(err, ConvertError::FatalWrite { code: StatusCode(-36), .. }));
        assert_eq!(sink.attempts, 2);
        assert_eq!(source.position, 20);
    }

    #[test]
    fn test_empty_source_finishes_immediately() {
        let mut source = RampSource { frames: 0, position: 0, seeks: vec![] };
        let mut sink = ScriptedSink::default();
        let report = run_loop(&mut source, &mut sink, true, 20).unwrap();
        assert_eq!(report, LoopReport::default());
        assert_eq!(sink.attempts, 0);
    }

    #[test]
    fn test_position_bookkeeping() {
        let mut position = StreamPosition::default();
        position.advance(10);
        position.advance(5);
        position.rewind(5);
        assert_eq!(position.frames(), 10);
    }
}
