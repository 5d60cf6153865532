//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use audioconvert::{ConversionJob, ConversionObserver, ConvertError};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Observer that records every callback it receives.
#[derive(Default)]
pub struct RecordingObserver {
    pub completed: Mutex<Vec<PathBuf>>,
    pub errors: Mutex<Vec<ConvertError>>,
}

impl RecordingObserver {
    pub fn completed(&self) -> Vec<PathBuf> {
        self.completed.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<ConvertError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn callbacks(&self) -> usize {
        self.completed().len() + self.errors().len()
    }
}

impl ConversionObserver for RecordingObserver {
    fn on_error(&self, _job: &ConversionJob, error: &ConvertError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_complete(&self, _job: &ConversionJob, destination: &Path) {
        self.completed.lock().unwrap().push(destination.to_path_buf());
    }
}

/// Writes a 16-bit WAV file holding a sine tone.
pub fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32) -> Vec<i16> {
    let spec = WavSpec { channels, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int };
    let mut writer = WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f32 * seconds) as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 12000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
            samples.push(value);
        }
    }
    writer.finalize().unwrap();
    samples
}
