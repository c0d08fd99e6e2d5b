//! Mixer: sums the frames of all voices into one output frame per tick.

use std::ops::Deref;

/// One tick of mono 16-bit audio
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<i16>);

impl Frame {
    pub fn silence(len: usize) -> Self {
        Frame(vec![0; len])
    }

    pub fn samples(&self) -> &[i16] {
        &self.0
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.0
    }

    pub fn peak(&self) -> i32 {
        self.0.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0)
    }

    /// Root mean square level, useful as a rough loudness meter
    pub fn rms(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.0.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.0.len() as f64).sqrt()
    }
}

impl From<Vec<i16>> for Frame {
    fn from(samples: Vec<i16>) -> Self {
        Frame(samples)
    }
}

impl Deref for Frame {
    type Target = [i16];

    fn deref(&self) -> &[i16] {
        &self.0
    }
}

/// A summing mixer with a 32-bit accumulator
#[derive(Debug, Clone)]
pub struct Mixer {
    tick_length: usize,
    buffer: Vec<i32>,
}

impl Mixer {
    pub fn new(tick_length: usize) -> Self {
        Mixer {
            tick_length,
            buffer: vec![0; tick_length],
        }
    }

    pub fn tick_length(&self) -> usize {
        self.tick_length
    }

    /// Sum `frames` and clip the result to the 16-bit range.
    ///
    /// With no frames the result is silence. Samples past `tick_length` are
    /// ignored and short frames only cover their own length.
    pub fn mix<'a, I>(&mut self, frames: I) -> Frame
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        self.buffer.clear();
        self.buffer.resize(self.tick_length, 0);
        for frame in frames {
            for (acc, &sample) in self.buffer.iter_mut().zip(frame.iter()) {
                *acc += sample as i32;
            }
        }
        self.buffer
            .iter()
            .map(|&s| s.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
            .collect::<Vec<_>>()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tick_is_silent() {
        let mut mixer = Mixer::new(735);
        let out = mixer.mix(std::iter::empty());
        assert_eq!(out.len(), 735);
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn sums_without_clipping() {
        let mut mixer = Mixer::new(4);
        let a = Frame::from(vec![8192; 4]);
        let b = Frame::from(vec![8192; 4]);
        assert_eq!(mixer.mix([&a, &b]).samples(), &[16384; 4]);
    }

    #[test]
    fn clips_at_sixteen_bits() {
        let mut mixer = Mixer::new(3);
        let a = Frame::from(vec![30000, -30000, 100]);
        let b = Frame::from(vec![30000, -30000, -50]);
        let out = mixer.mix([&a, &b]);
        assert_eq!(out.samples(), &[32767, -32768, 50]);
    }

    #[test]
    fn many_voices_do_not_overflow() {
        let mut mixer = Mixer::new(2);
        let frames: Vec<Frame> = (0..64).map(|_| Frame::from(vec![i16::MAX, i16::MIN])).collect();
        let out = mixer.mix(frames.iter());
        assert_eq!(out.samples(), &[i16::MAX, i16::MIN]);
    }

    #[test]
    fn short_frame_leaves_tail_alone() {
        let mut mixer = Mixer::new(4);
        let a = Frame::from(vec![1, 2]);
        let b = Frame::from(vec![10, 10, 10, 10]);
        assert_eq!(mixer.mix([&a, &b]).samples(), &[11, 12, 10, 10]);
    }

    #[test]
    fn levels() {
        let frame = Frame::from(vec![3, -4, 0, 0]);
        assert_eq!(frame.peak(), 4);
        assert!((frame.rms() - 2.5).abs() < 1e-12);
        assert_eq!(Frame::silence(10).rms(), 0.0);
    }
}
