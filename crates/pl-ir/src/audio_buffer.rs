//! Stereo-capable f32 block buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Frames rendered per engine block.
pub const BLOCK_SIZE: usize = 256;

/// A multichannel f32 audio buffer in planar layout.
///
/// Data is stored as `channels` contiguous planes of `frames` samples each.
/// `data[ch * frames + frame]` gives the sample for channel `ch` at `frame`.
/// Buses are allocated once at engine start and reused every block.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: u16,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: u16) -> Self {
        Self {
            data: vec![0.0; channels as usize * frames as usize],
            channels,
            frames,
        }
    }

    /// A silent stereo buffer of one engine block.
    pub fn stereo_block() -> Self {
        Self::new(2, BLOCK_SIZE as u16)
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> u16 {
        self.frames
    }

    /// Read-only access to one channel's sample data.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames as usize;
        &self.data[start..start + self.frames as usize]
    }

    /// Mutable access to one channel's sample data.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames as usize;
        let len = self.frames as usize;
        &mut self.data[start..start + len]
    }

    /// Both planes of a stereo buffer at once. A mono buffer yields its
    /// single plane and an empty right plane.
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        let len = self.frames as usize;
        let split = len.min(self.data.len());
        let (left, rest) = self.data.split_at_mut(split);
        let right_len = if self.channels >= 2 { len } else { 0 };
        (left, &mut rest[..right_len])
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, &s| acc.max(libm::fabsf(s)))
    }

    /// Interleave the first `frames` frames into a device buffer with
    /// `out_channels` channels. Channels this buffer lacks are zeroed.
    pub fn write_interleaved(&self, out: &mut [f32], out_channels: usize, frames: usize) {
        let frames = frames.min(self.frames as usize);
        for (i, frame) in out.chunks_mut(out_channels).take(frames).enumerate() {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = if ch < self.channels as usize {
                    self.data[ch * self.frames as usize + i]
                } else {
                    0.0
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_silent() {
        let buf = AudioBuffer::new(2, 4);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 4);
        assert!(buf.channel(0).iter().all(|&s| s == 0.0));
        assert!(buf.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stereo_block_has_block_size() {
        let buf = AudioBuffer::stereo_block();
        assert_eq!(buf.frames() as usize, BLOCK_SIZE);
        assert_eq!(buf.channels(), 2);
    }

    #[test]
    fn stereo_mut_splits_planes() {
        let mut buf = AudioBuffer::new(2, 2);
        {
            let (l, r) = buf.stereo_mut();
            l[1] = 0.5;
            r[0] = -0.5;
        }
        assert_eq!(buf.channel(0), &[0.0, 0.5]);
        assert_eq!(buf.channel(1), &[-0.5, 0.0]);
    }

    #[test]
    fn peak_is_largest_magnitude() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0)[1] = 0.5;
        buf.channel_mut(1)[0] = -0.75;
        assert!((buf.peak() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn write_interleaved_zero_fills_extra_channels() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0).copy_from_slice(&[0.1, 0.2]);
        buf.channel_mut(1).copy_from_slice(&[0.3, 0.4]);
        let mut out = [9.0f32; 6];
        buf.write_interleaved(&mut out, 3, 2);
        assert_eq!(out, [0.1, 0.3, 0.0, 0.2, 0.4, 0.0]);
    }

    #[test]
    fn write_interleaved_stops_at_requested_frames() {
        let mut buf = AudioBuffer::new(2, 4);
        buf.channel_mut(0).fill(1.0);
        let mut out = [5.0f32; 8];
        buf.write_interleaved(&mut out, 2, 1);
        assert_eq!(&out[..2], &[1.0, 0.0]);
        assert_eq!(&out[2..], &[5.0; 6]);
    }
}
