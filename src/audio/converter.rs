//! Streaming sample rate converter

use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use crate::error::{ConvertError, Result};

/// Linear-interpolation resampler that keeps its phase across chunks, so a
/// stream converted chunk by chunk matches the stream converted in one go.
#[derive(Debug, Clone)]
pub struct StreamingResampler {
    channels: usize,
    /// Input frames advanced per output frame.
    step: f64,
    /// Position of the next output frame, relative to the carried-over frame.
    position: f64,
    carry: Option<Array1<f32>>,
}

impl StreamingResampler {
    pub fn new(input_rate: f64, output_rate: f64, channels: usize) -> Result<Self> {
        Self::with_phase(input_rate, output_rate, channels, 0.0)
    }

    /// Starts the first output frame `phase` input frames after the first
    /// input frame, so a stream can be resumed mid-interpolation.
    pub fn with_phase(input_rate: f64, output_rate: f64, channels: usize, phase: f64) -> Result<Self> {
        if !(phase >= 0.0 && phase < 1.0) {
            return Err(ConvertError::audio(format!("Resampler phase must be in [0, 1), got {}", phase)));
        }
        if !(input_rate > 0.0) || !(output_rate > 0.0) {
            return Err(ConvertError::audio(format!(
                "Invalid resampling rates: {} -> {}", input_rate, output_rate
            )));
        }
        if channels == 0 {
            return Err(ConvertError::audio("Resampler needs at least one channel"));
        }

        Ok(Self {
            channels,
            step: input_rate / output_rate,
            position: phase,
            carry: None,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Converts one chunk of `frames x channels` samples.
    pub fn process(&mut self, chunk: ArrayView2<f32>) -> Result<Array2<f32>> {
        if chunk.ncols() != self.channels {
            return Err(ConvertError::audio(format!(
                "Expected {} channels, got {}", self.channels, chunk.ncols()
            )));
        }

        let input = match &self.carry {
            Some(last) => concatenate(Axis(0), &[last.view().insert_axis(Axis(0)), chunk.view()])
                .map_err(|e| ConvertError::audio(format!("Failed to join chunks: {}", e)))?,
            None => chunk.to_owned(),
        };
        if input.nrows() == 0 {
            return Ok(Array2::zeros((0, self.channels)));
        }

        let last_index = input.nrows() - 1;
        let mut positions = Vec::new();
        while (self.position.floor() as usize) < last_index {
            positions.push(self.position);
            self.position += self.step;
        }

        let mut output = Array2::zeros((positions.len(), self.channels));
        for ch in 0..self.channels {
            Self::interpolate(input.column(ch), &positions, output.column_mut(ch));
        }

        self.position -= last_index as f64;
        self.carry = Some(input.row(last_index).to_owned());
        Ok(output)
    }

    /// Emits the frames that fall after the last input frame, holding its value.
    pub fn flush(&mut self) -> Array2<f32> {
        let Some(last) = self.carry.take() else {
            return Array2::zeros((0, self.channels));
        };

        let mut count = 0;
        while self.position < 1.0 {
            count += 1;
            self.position += self.step;
        }
        self.position = 0.0;

        let mut output = Array2::zeros((count, self.channels));
        for mut row in output.rows_mut() {
            row.assign(&last);
        }
        output
    }

    fn interpolate(data: ArrayView1<f32>, positions: &[f64], mut out: ArrayViewMut1<f32>) {
        for (i, &pos) in positions.iter().enumerate() {
            let index = pos.floor() as usize;
            let fraction = (pos - index as f64) as f32;
            out[i] = data[index] + (data[index + 1] - data[index]) * fraction;
        }
    }
}
