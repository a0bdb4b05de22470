use aliasr_core::BridgeError;
use rubato::{FftFixedIn, Resampler as _};

/// Stateful mono linear-PCM rate converter.
///
/// Buffers incoming samples into fixed-size chunks for the FFT
/// resampler, so frames of any length can be fed as long as they
/// arrive in order. Recreating it discards filter continuity, which is
/// only acceptable at session boundaries.
pub struct Resampler {
    inner: FftFixedIn<f32>,
    input_buffer: Vec<f32>,
    chunk_size: usize,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32, chunk_size: usize) -> Result<Self, BridgeError> {
        let inner = FftFixedIn::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            chunk_size,
            2, // sub chunks
            1, // mono
        )
        .map_err(|e| BridgeError::Resample(e.to_string()))?;

        Ok(Self {
            inner,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        })
    }

    /// Converts a slice of i16 samples, returning whatever full chunks
    /// produce. Leftover samples stay buffered for the next call.
    pub fn process(&mut self, input: &[i16]) -> Result<Vec<i16>, BridgeError> {
        for &sample in input {
            self.input_buffer.push(sample as f32 / 32768.0);
        }

        let mut output = Vec::new();
        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            let resampled = self
                .inner
                .process(&[chunk], None)
                .map_err(|e| BridgeError::Resample(e.to_string()))?;
            for &sample in &resampled[0] {
                output.push((sample.clamp(-1.0, 1.0) * 32767.0) as i16);
            }
        }

        tracing::trace!("resampled {} -> {} samples", input.len(), output.len());
        Ok(output)
    }

    /// Zero-pads and drains the trailing partial chunk.
    pub fn flush(&mut self) -> Result<Vec<i16>, BridgeError> {
        if self.input_buffer.is_empty() {
            return Ok(Vec::new());
        }
        self.input_buffer.resize(self.chunk_size, 0.0);
        self.process(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halves_sample_count_16k_to_8k() {
        let mut resampler = Resampler::new(16000, 8000, 320).unwrap();
        let frame = vec![0i16; 320];
        let mut total_out = 0;
        // One second of 16kHz audio in 20ms frames.
        for _ in 0..50 {
            total_out += resampler.process(&frame).unwrap().len();
        }
        assert_eq!(total_out, 8000);
    }

    #[test]
    fn test_partial_frames_are_buffered() {
        let mut resampler = Resampler::new(16000, 8000, 320).unwrap();
        let out = resampler.process(&[0i16; 100]).unwrap();
        assert!(out.is_empty());
        let out = resampler.process(&[0i16; 220]).unwrap();
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn test_flush_drains_remainder() {
        let mut resampler = Resampler::new(16000, 8000, 320).unwrap();
        resampler.process(&[1000i16; 100]).unwrap();
        let out = resampler.flush().unwrap();
        assert_eq!(out.len(), 160);
        // Flushing again yields nothing.
        assert!(resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn test_output_stays_in_i16_range_for_full_scale_input() {
        let mut resampler = Resampler::new(16000, 8000, 320).unwrap();
        let loud: Vec<i16> = (0..640)
            .map(|i| if i % 2 == 0 { i16::MAX } else { i16::MIN })
            .collect();
        // Clamping means no wrap-around panic regardless of filter ringing.
        resampler.process(&loud).unwrap();
    }

    #[test]
    fn test_upsampling_8k_to_16k() {
        let mut resampler = Resampler::new(8000, 16000, 160).unwrap();
        let mut total_out = 0;
        for _ in 0..50 {
            total_out += resampler.process(&[0i16; 160]).unwrap().len();
        }
        assert_eq!(total_out, 16000);
    }
}
