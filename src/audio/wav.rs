//! WAV file backend built on hound

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, error, warn};
use ndarray::Array2;

use crate::audio::converter::StreamingResampler;
use crate::audio::io::{AudioFile, AudioFileIo, Converter, ResumeCapability, WriteOutcome};
use crate::audio::sample::{self, SampleEncoding};
use crate::audio::{ContainerType, CreateFlags, FormatFlags, FormatId, StreamDescription};
use crate::error::{ConvertError, Result, StatusCode};

/// Status reported when the underlying file cannot be written.
pub const IO_ERR: StatusCode = StatusCode(-36);

/// [`AudioFileIo`] for WAV files holding linear PCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavFileIo;

impl WavFileIo {
    pub fn new() -> Self {
        Self
    }
}

impl AudioFileIo for WavFileIo {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioFile>> {
        Ok(Box::new(WavSourceFile::open(path)?))
    }

    fn create(
        &self,
        path: &Path,
        container: ContainerType,
        format: &StreamDescription,
        flags: CreateFlags,
    ) -> Result<Box<dyn AudioFile>> {
        Ok(Box::new(WavDestinationFile::create(path, container, format, flags)?))
    }
}

fn describe_spec(spec: &WavSpec) -> StreamDescription {
    let bytes_per_sample = (spec.bits_per_sample as u32).div_ceil(8);
    let bytes_per_frame = bytes_per_sample * spec.channels as u32;
    let flags = match spec.sample_format {
        SampleFormat::Float => FormatFlags::IS_FLOAT | FormatFlags::IS_PACKED,
        SampleFormat::Int => FormatFlags::IS_SIGNED_INTEGER | FormatFlags::IS_PACKED,
    };

    StreamDescription {
        sample_rate: spec.sample_rate as f64,
        format_id: FormatId::LinearPcm,
        channels: spec.channels as u32,
        bits_per_channel: spec.bits_per_sample as u32,
        bytes_per_frame,
        bytes_per_packet: bytes_per_frame,
        frames_per_packet: 1,
        flags,
    }
}

fn spec_for(format: &StreamDescription) -> Result<WavSpec> {
    if !format.is_linear_pcm() {
        return Err(ConvertError::setup(format!(
            "WAV container cannot store '{}' data", format.format_id
        )));
    }
    if format.sample_rate.fract() != 0.0 || !(format.sample_rate >= 1.0) || format.sample_rate > u32::MAX as f64 {
        return Err(ConvertError::setup(format!(
            "WAV needs a whole sample rate, got {}", format.sample_rate
        )));
    }
    if format.channels == 0 || format.channels > u16::MAX as u32 {
        return Err(ConvertError::setup(format!("Invalid channel count: {}", format.channels)));
    }

    let sample_format = if format.is_float() {
        if format.bits_per_channel != 32 {
            return Err(ConvertError::setup("WAV float data must be 32-bit"));
        }
        SampleFormat::Float
    } else {
        if !matches!(format.bits_per_channel, 8 | 16 | 24 | 32) {
            return Err(ConvertError::setup(format!(
                "Unsupported WAV bit depth: {}", format.bits_per_channel
            )));
        }
        SampleFormat::Int
    };

    Ok(WavSpec {
        channels: format.channels as u16,
        sample_rate: format.sample_rate as u32,
        bits_per_sample: format.bits_per_channel as u16,
        sample_format,
    })
}

/// Client layout that matches the file data, used until a client format is set.
fn default_client(file_format: &StreamDescription) -> Option<SampleEncoding> {
    SampleEncoding::for_client(file_format).ok()
}

/// File frames pulled through the resampler per refill.
const RESAMPLE_CHUNK_FRAMES: u32 = 1024;

/// Read-side rate conversion. Positions handed to `seek` are in client frames.
struct ReadResampler {
    resampler: StreamingResampler,
    client_rate: f64,
    pending: VecDeque<i32>,
    flushed: bool,
}

/// A WAV file opened for reading.
pub struct WavSourceFile {
    path: PathBuf,
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    file_format: StreamDescription,
    client: Option<SampleEncoding>,
    resampling: Option<ReadResampler>,
    frame_position: u32,
    total_frames: u32,
}

impl WavSourceFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|e| {
            ConvertError::setup(format!("Cannot open audio file {}: {}", path.display(), e))
        })?;

        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(ConvertError::setup(format!(
                "Invalid WAV header in {}: {} Hz, {} channel(s)",
                path.display(), spec.sample_rate, spec.channels
            )));
        }

        let file_format = describe_spec(&spec);
        let total_frames = reader.duration();
        debug!("Opened {}: {} frames", path.display(), total_frames);

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            spec,
            client: default_client(&file_format),
            file_format,
            resampling: None,
            frame_position: 0,
            total_frames,
        })
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    fn read_samples<F>(&mut self, count: usize, mut sink: F) -> Result<usize>
    where
        F: FnMut(usize, i32),
    {
        let bits = self.spec.bits_per_sample;
        let mut read = 0;
        match self.spec.sample_format {
            SampleFormat::Int => {
                for value in self.reader.samples::<i32>().take(count) {
                    let value = value.map_err(|e| ConvertError::read(format!("Failed to read sample: {}", e)))?;
                    sink(read, sample::int_to_full(value, bits));
                    read += 1;
                }
            }
            SampleFormat::Float => {
                for value in self.reader.samples::<f32>().take(count) {
                    let value = value.map_err(|e| ConvertError::read(format!("Failed to read sample: {}", e)))?;
                    sink(read, sample::f32_to_full(value));
                    read += 1;
                }
            }
        }
        Ok(read)
    }

    fn read_direct(&mut self, frames: u32, encoding: SampleEncoding, buffer: &mut [u8]) -> Result<u32> {
        let frames = frames.min(self.total_frames.saturating_sub(self.frame_position));
        if frames == 0 {
            return Ok(0);
        }

        let bytes_per_sample = encoding.bytes_per_sample();
        let wanted = frames as usize * self.spec.channels as usize;
        let read = self.read_samples(wanted, |i, full| {
            let start = i * bytes_per_sample;
            encoding.encode(full, &mut buffer[start..start + bytes_per_sample]);
        })?;
        if read != wanted {
            return Err(ConvertError::read(format!(
                "{} ended after {} of {} samples", self.path.display(), read, wanted
            )));
        }

        self.frame_position += frames;
        Ok(frames)
    }

    /// Pulls file frames through the resampler until `frames` client frames
    /// are pending or the file is exhausted.
    fn refill(&mut self, frames: u32) -> Result<()> {
        let channels = self.spec.channels as usize;
        loop {
            let Some(resampling) = self.resampling.as_ref() else {
                return Ok(());
            };
            if resampling.flushed || resampling.pending.len() >= frames as usize * channels {
                return Ok(());
            }

            let chunk_frames = RESAMPLE_CHUNK_FRAMES.min(self.total_frames.saturating_sub(self.frame_position));
            let mut raw = vec![0i32; chunk_frames as usize * channels];
            let read = self.read_samples(raw.len(), |i, full| raw[i] = full)?;
            if read != raw.len() {
                return Err(ConvertError::read(format!(
                    "{} ended after {} of {} samples", self.path.display(), read, raw.len()
                )));
            }
            self.frame_position += chunk_frames;

            let Some(resampling) = self.resampling.as_mut() else {
                return Ok(());
            };
            let output = if chunk_frames == 0 {
                resampling.flushed = true;
                resampling.resampler.flush()
            } else {
                let chunk = Array2::from_shape_fn((chunk_frames as usize, channels), |(frame, ch)| {
                    sample::full_to_f32(raw[frame * channels + ch])
                });
                resampling.resampler.process(chunk.view())?
            };
            resampling.pending.extend(output.iter().map(|&s| sample::f32_to_full(s)));
        }
    }

    fn read_resampled(&mut self, frames: u32, encoding: SampleEncoding, buffer: &mut [u8]) -> Result<u32> {
        self.refill(frames)?;
        let channels = self.spec.channels as usize;
        let bytes_per_sample = encoding.bytes_per_sample();
        let Some(resampling) = self.resampling.as_mut() else {
            return Ok(0);
        };

        let available = (resampling.pending.len() / channels).min(frames as usize);
        for (i, full) in resampling.pending.drain(..available * channels).enumerate() {
            let start = i * bytes_per_sample;
            encoding.encode(full, &mut buffer[start..start + bytes_per_sample]);
        }
        Ok(available as u32)
    }
}

impl AudioFile for WavSourceFile {
    fn file_format(&self) -> Result<StreamDescription> {
        Ok(self.file_format)
    }

    fn set_client_format(&mut self, format: &StreamDescription) -> Result<()> {
        let encoding = SampleEncoding::for_client(format)?;
        if format.channels != self.file_format.channels {
            return Err(ConvertError::setup(format!(
                "Cannot remix {} channel(s) to {} when reading", self.file_format.channels, format.channels
            )));
        }
        self.resampling = if format.sample_rate != self.file_format.sample_rate {
            debug!(
                "Resampling {} from {} Hz to {} Hz on read",
                self.path.display(), self.file_format.sample_rate, format.sample_rate
            );
            Some(ReadResampler {
                resampler: StreamingResampler::new(
                    self.file_format.sample_rate,
                    format.sample_rate,
                    format.channels as usize,
                )?,
                client_rate: format.sample_rate,
                pending: VecDeque::new(),
                flushed: false,
            })
        } else {
            None
        };
        self.client = Some(encoding);
        Ok(())
    }

    fn read(&mut self, max_frames: u32, buffer: &mut [u8]) -> Result<u32> {
        let encoding = self.client.ok_or_else(|| {
            ConvertError::read(format!("No client format set for {}", self.path.display()))
        })?;
        let capacity = (buffer.len() / (encoding.bytes_per_sample() * self.spec.channels as usize)) as u32;
        let frames = max_frames.min(capacity);
        if frames == 0 {
            return Ok(0);
        }

        if self.resampling.is_some() {
            self.read_resampled(frames, encoding, buffer)
        } else {
            self.read_direct(frames, encoding, buffer)
        }
    }

    fn write(&mut self, _frames: u32, _buffer: &[u8]) -> WriteOutcome {
        warn!("Write attempted on source file {}", self.path.display());
        WriteOutcome::Failed(StatusCode::PARAM_ERR)
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        // a resampled client frame sits between two file frames; restart
        // interpolation at the earlier one with the remaining phase
        let (file_frame, phase) = match &self.resampling {
            Some(resampling) => {
                let position = frame as f64 * self.file_format.sample_rate / resampling.client_rate;
                let file_frame = position.floor();
                (file_frame as u64, position - file_frame)
            }
            None => (frame, 0.0),
        };
        if file_frame > self.total_frames as u64 {
            return Err(ConvertError::seek(format!(
                "Frame {} is past the end of {} ({} frames)", frame, self.path.display(), self.total_frames
            )));
        }
        self.reader
            .seek(file_frame as u32)
            .map_err(|e| ConvertError::seek(format!("Failed to seek to frame {}: {}", frame, e)))?;
        self.frame_position = file_frame as u32;

        if let Some(resampling) = self.resampling.as_mut() {
            resampling.resampler = StreamingResampler::with_phase(
                self.file_format.sample_rate,
                resampling.client_rate,
                self.spec.channels as usize,
                phase,
            )?;
            resampling.pending.clear();
            resampling.flushed = false;
        }
        Ok(())
    }

    fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>> {
        Ok(None)
    }
}

/// Software sample rate converter of a WAV destination. Holds no hardware
/// state, so it always survives interruptions.
#[derive(Debug, Clone, Copy)]
pub struct SoftwareConverter {
    pub input_rate: f64,
    pub output_rate: f64,
}

impl Converter for SoftwareConverter {
    fn can_resume(&self) -> Result<ResumeCapability> {
        Ok(ResumeCapability::CanResume)
    }
}

/// A WAV file created for writing.
pub struct WavDestinationFile {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    spec: WavSpec,
    file_format: StreamDescription,
    client: Option<SampleEncoding>,
    resampler: Option<StreamingResampler>,
    converter: Option<SoftwareConverter>,
    scratch: Vec<i32>,
    frames_written: u64,
}

impl WavDestinationFile {
    pub fn create<P: AsRef<Path>>(
        path: P,
        container: ContainerType,
        format: &StreamDescription,
        flags: CreateFlags,
    ) -> Result<Self> {
        let path = path.as_ref();
        if container != ContainerType::Wav {
            return Err(ConvertError::setup(format!(
                "Unsupported container '{}', only wav can be written", container.name()
            )));
        }
        if !flags.erase_file && path.exists() {
            return Err(ConvertError::setup(format!("Destination already exists: {}", path.display())));
        }

        let spec = spec_for(format)?;
        let writer = WavWriter::create(path, spec).map_err(|e| {
            ConvertError::setup(format!("Cannot create output file {}: {}", path.display(), e))
        })?;
        let file_format = describe_spec(&spec);

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            spec,
            client: default_client(&file_format),
            file_format,
            resampler: None,
            converter: None,
            scratch: Vec::new(),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_full(writer: &mut WavWriter<BufWriter<File>>, spec: &WavSpec, full: i32) -> hound::Result<()> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, _) => writer.write_sample(sample::full_to_f32(full)),
            (SampleFormat::Int, 8) => writer.write_sample(sample::full_to_int(full, 8) as i8),
            (SampleFormat::Int, 16) => writer.write_sample(sample::full_to_int(full, 16) as i16),
            (SampleFormat::Int, bits) => writer.write_sample(sample::full_to_int(full, bits)),
        }
    }

    /// Runs interleaved full-scale samples through the resampler.
    fn resample(resampler: &mut StreamingResampler, samples: &[i32]) -> Result<Vec<i32>> {
        let channels = resampler.channels();
        let chunk = Array2::from_shape_fn((samples.len() / channels, channels), |(frame, ch)| {
            sample::full_to_f32(samples[frame * channels + ch])
        });
        let output = resampler.process(chunk.view())?;
        Ok(output.iter().map(|&s| sample::f32_to_full(s)).collect())
    }

    fn write_samples(&mut self, samples: &[i32]) -> hound::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(hound::Error::IoError(std::io::Error::other("writer already finalized")));
        };
        for &full in samples {
            Self::write_full(writer, &self.spec, full)?;
        }
        self.frames_written += (samples.len() / self.spec.channels as usize) as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut resampler) = self.resampler.take() {
            let tail: Vec<i32> = resampler.flush().iter().map(|&s| sample::f32_to_full(s)).collect();
            self.write_samples(&tail)?;
        }
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        debug!("Finalized {}: {} frames", self.path.display(), self.frames_written);
        Ok(())
    }
}

impl AudioFile for WavDestinationFile {
    fn file_format(&self) -> Result<StreamDescription> {
        Ok(self.file_format)
    }

    fn set_client_format(&mut self, format: &StreamDescription) -> Result<()> {
        let encoding = SampleEncoding::for_client(format)?;
        if format.channels != self.file_format.channels {
            return Err(ConvertError::setup(format!(
                "Cannot remix {} channel(s) to {} when writing", format.channels, self.file_format.channels
            )));
        }

        if format.sample_rate != self.file_format.sample_rate {
            self.resampler = Some(StreamingResampler::new(
                format.sample_rate,
                self.file_format.sample_rate,
                format.channels as usize,
            )?);
            self.converter = Some(SoftwareConverter {
                input_rate: format.sample_rate,
                output_rate: self.file_format.sample_rate,
            });
        } else {
            self.resampler = None;
            self.converter = None;
        }
        self.client = Some(encoding);
        Ok(())
    }

    fn read(&mut self, _max_frames: u32, _buffer: &mut [u8]) -> Result<u32> {
        Err(ConvertError::read(format!("{} was opened for writing", self.path.display())))
    }

    fn write(&mut self, frames: u32, buffer: &[u8]) -> WriteOutcome {
        let Some(encoding) = self.client else {
            return WriteOutcome::Failed(StatusCode::PARAM_ERR);
        };
        let needed = frames as usize * encoding.bytes_per_sample() * self.spec.channels as usize;
        if buffer.len() < needed {
            error!("Write of {} frames given only {} bytes", frames, buffer.len());
            return WriteOutcome::Failed(StatusCode::PARAM_ERR);
        }

        let mut samples = std::mem::take(&mut self.scratch);
        samples.clear();
        encoding.decode_all(&buffer[..needed], &mut samples);

        let result = match self.resampler.as_mut() {
            Some(resampler) => match Self::resample(resampler, &samples) {
                Ok(resampled) => self.write_samples(&resampled),
                Err(e) => {
                    error!("Resampling failed: {}", e);
                    self.scratch = samples;
                    return WriteOutcome::Failed(StatusCode::PARAM_ERR);
                }
            },
            None => self.write_samples(&samples),
        };
        self.scratch = samples;

        match result {
            Ok(()) => WriteOutcome::Success,
            Err(e) => {
                error!("Failed to write {}: {}", self.path.display(), e);
                WriteOutcome::Failed(IO_ERR)
            }
        }
    }

    fn seek(&mut self, _frame: u64) -> Result<()> {
        Err(ConvertError::seek("Destination files do not support seeking"))
    }

    fn take_converter(&mut self) -> Result<Option<Box<dyn Converter>>> {
        Ok(self.converter.take().map(|c| Box::new(c) as Box<dyn Converter>))
    }

    fn dispose(mut self: Box<Self>) {
        if let Err(e) = self.finish() {
            error!("Failed to finalize {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for WavDestinationFile {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.finish() {
                error!("Failed to finalize {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_ramp(path: &Path, spec: WavSpec, frames: u32) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for ch in 0..spec.channels {
                writer.write_sample((i as i16).wrapping_add(ch as i16 * 1000)).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn pcm16(channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec { channels, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int }
    }

    #[test]
    fn test_source_format_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        write_ramp(&path, pcm16(2, 22050), 10);

        let mut source = WavSourceFile::open(&path).unwrap();
        let format = source.file_format().unwrap();
        assert_eq!(format.sample_rate, 22050.0);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bytes_per_frame, 4);
        assert_eq!(source.total_frames(), 10);

        let mut buf = vec![0u8; 4 * 4];
        assert_eq!(source.read(100, &mut buf).unwrap(), 4);
        assert_eq!(i16::from_ne_bytes([buf[4], buf[5]]), 1);
        assert_eq!(i16::from_ne_bytes([buf[6], buf[7]]), 1001);
    }

    #[test]
    fn test_source_seek_rereads_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        write_ramp(&path, pcm16(1, 8000), 8);

        let mut source = WavSourceFile::open(&path).unwrap();
        let mut first = vec![0u8; 8];
        assert_eq!(source.read(4, &mut first).unwrap(), 4);
        source.seek(0).unwrap();
        let mut again = vec![0u8; 8];
        assert_eq!(source.read(4, &mut again).unwrap(), 4);
        assert_eq!(first, again);

        assert!(source.seek(9).is_err());
    }

    #[test]
    fn test_source_resamples_to_client_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        write_ramp(&path, pcm16(1, 8000), 4);

        let mut source = WavSourceFile::open(&path).unwrap();
        source.set_client_format(&StreamDescription::linear_pcm(16000.0, 1, 16)).unwrap();

        let mut buf = vec![0u8; 3 * 2];
        let mut frames = Vec::new();
        loop {
            let read = source.read(3, &mut buf).unwrap();
            if read == 0 {
                break;
            }
            frames.extend(buf[..read as usize * 2].chunks(2).map(|b| i16::from_ne_bytes([b[0], b[1]])));
        }
        assert_eq!(frames.len(), 8);
        assert_eq!(frames[0], 0);
        assert_eq!(frames[2], 1);

        source.seek(0).unwrap();
        assert_eq!(source.read(3, &mut buf).unwrap(), 3);
        assert_eq!(i16::from_ne_bytes([buf[0], buf[1]]), 0);
    }

    #[test]
    fn test_resampled_seek_rereads_same_client_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        let mut writer = WavWriter::create(&path, pcm16(1, 8000)).unwrap();
        for i in 0..8i16 {
            writer.write_sample(i * 100).unwrap();
        }
        writer.finalize().unwrap();

        let mut source = WavSourceFile::open(&path).unwrap();
        source.set_client_format(&StreamDescription::linear_pcm(16000.0, 1, 16)).unwrap();
        let read_cycle = |source: &mut WavSourceFile| {
            let mut buf = vec![0u8; 3 * 2];
            let read = source.read(3, &mut buf).unwrap() as usize;
            buf[..read * 2].chunks(2).map(|b| i16::from_ne_bytes([b[0], b[1]])).collect::<Vec<_>>()
        };

        assert_eq!(read_cycle(&mut source), vec![0, 50, 100]);
        let second = read_cycle(&mut source);
        assert_eq!(second, vec![150, 200, 250]);

        source.seek(3).unwrap();
        assert_eq!(read_cycle(&mut source), second);
        assert_eq!(read_cycle(&mut source), vec![300, 350, 400]);
    }

    #[test]
    fn test_source_rejects_remixing_client() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        write_ramp(&path, pcm16(1, 8000), 4);

        let mut source = WavSourceFile::open(&path).unwrap();
        let client = StreamDescription::linear_pcm(8000.0, 2, 16);
        assert!(source.set_client_format(&client).unwrap_err().is_setup());
    }

    #[test]
    fn test_destination_widens_to_client_32_bit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let format = StreamDescription::linear_pcm(8000.0, 1, 16);

        let mut dest = Box::new(
            WavDestinationFile::create(&path, ContainerType::Wav, &format, CreateFlags::default()).unwrap(),
        );
        dest.set_client_format(&StreamDescription::linear_pcm(8000.0, 1, 32)).unwrap();
        assert!(dest.take_converter().unwrap().is_none());

        let samples: Vec<u8> = [100i32 << 16, -(7i32 << 16)].iter().flat_map(|s| s.to_ne_bytes()).collect();
        assert_eq!(dest.write(2, &samples), WriteOutcome::Success);
        dest.dispose();

        let reader = WavReader::open(&path).unwrap();
        let written: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(written, vec![100, -7]);
    }

    #[test]
    fn test_destination_resamples_and_flushes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let format = StreamDescription::linear_pcm(16000.0, 1, 16);

        let mut dest = Box::new(
            WavDestinationFile::create(&path, ContainerType::Wav, &format, CreateFlags::default()).unwrap(),
        );
        dest.set_client_format(&StreamDescription::linear_pcm(8000.0, 1, 16)).unwrap();
        let converter = dest.take_converter().unwrap().expect("rate change needs a converter");
        assert_eq!(converter.can_resume().unwrap(), ResumeCapability::CanResume);

        let samples: Vec<u8> = [0i16, 1000, 2000, 3000].iter().flat_map(|s| s.to_ne_bytes()).collect();
        assert_eq!(dest.write(4, &samples), WriteOutcome::Success);
        dest.dispose();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.duration(), 8);
    }

    #[test]
    fn test_destination_rejects_compressed_and_other_containers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.caf");
        let pcm = StreamDescription::linear_pcm(8000.0, 1, 16);
        assert!(WavDestinationFile::create(&path, ContainerType::Caf, &pcm, CreateFlags::default()).is_err());

        let ilbc = StreamDescription { format_id: FormatId::Ilbc, ..pcm };
        assert!(WavDestinationFile::create(&path, ContainerType::Wav, &ilbc, CreateFlags::default()).is_err());
    }

    #[test]
    fn test_create_without_erase_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        std::fs::write(&path, b"keep").unwrap();
        let pcm = StreamDescription::linear_pcm(8000.0, 1, 16);
        let result = WavDestinationFile::create(&path, ContainerType::Wav, &pcm, CreateFlags { erase_file: false });
        assert!(result.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    }
}
