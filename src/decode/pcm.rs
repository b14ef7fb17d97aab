// PCM accumulator: append-only interleaved float output

/// Collects trimmed decoder output for a whole session
#[derive(Debug)]
pub struct PcmAccumulator {
    samples: Vec<f32>,
    channels: usize,
    gain: f32,
}

impl PcmAccumulator {
    pub fn new() -> Self {
        PcmAccumulator {
            samples: Vec::new(),
            channels: 0,
            gain: 1.0,
        }
    }

    /// Set the layout and gain for the samples that follow
    pub fn configure(&mut self, channels: usize, gain: f32) {
        self.channels = channels;
        self.gain = gain;
    }

    /// Append interleaved samples, applying the configured gain
    pub fn append(&mut self, interleaved: &[f32]) {
        if self.gain == 1.0 {
            self.samples.extend_from_slice(interleaved);
        } else {
            let gain = self.gain;
            self.samples.extend(interleaved.iter().map(|&s| s * gain));
        }
    }

    /// Samples per channel written so far
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            channels => self.samples.len() / channels,
        }
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl Default for PcmAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
