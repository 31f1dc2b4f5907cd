//! Sample types and audio buffer definitions

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Planar multichannel buffer
///
/// Storage is allocated once for `capacity` frames per channel. The active
/// length can then be changed per block with [`AudioBuffer::set_num_frames`]
/// without touching the allocator, which is what lets the engine reuse its
/// band buffers inside the audio callback.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<Sample>>,
    num_frames: usize,
    capacity: usize,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; num_channels],
            num_frames: capacity,
            capacity,
        }
    }

    /// Build a buffer from per-channel sample vectors of equal length
    pub fn from_channels(channels: Vec<Vec<Sample>>) -> Self {
        let capacity = channels.iter().map(Vec::len).min().unwrap_or(0);
        let channels = channels
            .into_iter()
            .map(|mut ch| {
                ch.truncate(capacity);
                ch
            })
            .collect();
        Self {
            channels,
            num_frames: capacity,
            capacity,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the active length. Values above the capacity are clamped.
    #[inline]
    pub fn set_num_frames(&mut self, num_frames: usize) {
        self.num_frames = num_frames.min(self.capacity);
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        &self.channels[index][..self.num_frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [Sample] {
        &mut self.channels[index][..self.num_frames]
    }

    /// Iterate the active region of every channel
    pub fn channels(&self) -> impl Iterator<Item = &[Sample]> {
        let n = self.num_frames;
        self.channels.iter().map(move |ch| &ch[..n])
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [Sample]> {
        let n = self.num_frames;
        self.channels.iter_mut().map(move |ch| &mut ch[..n])
    }

    /// Zero the active region
    pub fn clear(&mut self) {
        for ch in self.channels_mut() {
            ch.fill(0.0);
        }
    }

    /// Copy `other` into this buffer, adopting its active length.
    ///
    /// Only the overlapping channels and frames are copied.
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        self.set_num_frames(other.num_frames);
        let n = self.num_frames;
        for (dst, src) in self.channels.iter_mut().zip(other.channels()) {
            dst[..n].copy_from_slice(&src[..n]);
        }
    }

    /// Accumulate `other * gain` into this buffer
    pub fn add_from(&mut self, other: &AudioBuffer, gain: Sample) {
        for (dst, src) in self.channels_mut().zip(other.channels()) {
            for (d, &s) in dst.iter_mut().zip(src) {
                *d += s * gain;
            }
        }
    }

    pub fn apply_gain(&mut self, gain: Sample) {
        for ch in self.channels_mut() {
            for sample in ch.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Largest absolute sample in the active region
    pub fn peak(&self) -> Sample {
        self.channels()
            .flat_map(|ch| ch.iter())
            .fold(0.0, |acc: Sample, &s| acc.max(s.abs()))
    }

    /// De-interleave `data` into the buffer. Returns the number of frames read.
    pub fn copy_from_interleaved(&mut self, data: &[Sample]) -> usize {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            return 0;
        }
        let frames = (data.len() / num_channels).min(self.capacity);
        self.set_num_frames(frames);
        for (frame, chunk) in data.chunks_exact(num_channels).take(frames).enumerate() {
            for (ch, &s) in self.channels.iter_mut().zip(chunk) {
                ch[frame] = s;
            }
        }
        frames
    }

    /// Interleave the active region onto the end of `out`
    pub fn copy_to_interleaved(&self, out: &mut Vec<Sample>) {
        out.reserve(self.num_frames * self.num_channels());
        for frame in 0..self.num_frames {
            for ch in &self.channels {
                out.push(ch[frame]);
            }
        }
    }
}
