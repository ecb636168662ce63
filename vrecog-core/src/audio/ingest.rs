//! Audio ingestion adapter
//!
//! Normalises the accepted sample encodings into one canonical waveform:
//! mono `f32` in `[-1.0, 1.0]`.

use crate::error::{VRecogError, VRecogResult};

/// Sample width of a raw PCM byte buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    /// 8-bit unsigned, offset binary
    U8,
    /// 16-bit signed little endian
    S16Le,
}

impl SampleWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16Le => 2,
        }
    }
}

/// One chunk of caller audio, borrowed
#[derive(Debug, Clone, Copy)]
pub enum AudioBuffer<'a> {
    Bytes { data: &'a [u8], width: SampleWidth },
    Shorts(&'a [i16]),
    Floats(&'a [f32]),
}

impl<'a> AudioBuffer<'a> {
    /// 16-bit little-endian PCM bytes, the common wire format
    pub fn pcm16(data: &'a [u8]) -> Self {
        Self::Bytes {
            data,
            width: SampleWidth::S16Le,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes { data, .. } => data.is_empty(),
            Self::Shorts(s) => s.is_empty(),
            Self::Floats(f) => f.is_empty(),
        }
    }

    /// Convert to the canonical waveform.
    ///
    /// Validates before converting, so a rejected buffer leaves nothing
    /// behind.
    pub fn to_waveform(&self) -> VRecogResult<Vec<f32>> {
        match *self {
            Self::Bytes { data, width } => {
                if data.len() % width.bytes() != 0 {
                    return Err(VRecogError::InvalidAudioFormat(format!(
                        "{} bytes is not a multiple of the {}-byte sample width",
                        data.len(),
                        width.bytes()
                    )));
                }
                Ok(match width {
                    SampleWidth::U8 => data.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
                    SampleWidth::S16Le => data
                        .chunks_exact(2)
                        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
                        .collect(),
                })
            }
            Self::Shorts(samples) => Ok(samples.iter().map(|&s| s as f32 / 32768.0).collect()),
            Self::Floats(samples) => {
                if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
                    return Err(VRecogError::InvalidAudioFormat(format!(
                        "non-finite sample at index {}",
                        pos
                    )));
                }
                Ok(samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_conversion() {
        let bytes: Vec<u8> = [0i16, 16384, -32768, 32767]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let wave = AudioBuffer::pcm16(&bytes).to_waveform().unwrap();
        assert_eq!(wave.len(), 4);
        assert_eq!(wave[0], 0.0);
        assert!((wave[1] - 0.5).abs() < 1e-6);
        assert_eq!(wave[2], -1.0);
        assert!(wave[3] < 1.0 && wave[3] > 0.999);
    }

    #[test]
    fn test_odd_byte_length_rejected() {
        let result = AudioBuffer::pcm16(&[0, 1, 2]).to_waveform();
        assert!(matches!(result, Err(VRecogError::InvalidAudioFormat(_))));
    }

    #[test]
    fn test_u8_conversion() {
        let buffer = AudioBuffer::Bytes {
            data: &[128, 0, 255],
            width: SampleWidth::U8,
        };
        let wave = buffer.to_waveform().unwrap();
        assert_eq!(wave[0], 0.0);
        assert_eq!(wave[1], -1.0);
        assert!(wave[2] > 0.99);
    }

    #[test]
    fn test_shorts_and_floats_agree() {
        let shorts = [1000i16, -2000, 3000];
        let floats: Vec<f32> = shorts.iter().map(|&s| s as f32 / 32768.0).collect();

        assert_eq!(
            AudioBuffer::Shorts(&shorts).to_waveform().unwrap(),
            AudioBuffer::Floats(&floats).to_waveform().unwrap()
        );
    }

    #[test]
    fn test_floats_validated() {
        assert!(AudioBuffer::Floats(&[0.1, f32::NAN]).to_waveform().is_err());
        assert_eq!(AudioBuffer::Floats(&[1.5, -2.0]).to_waveform().unwrap(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_empty() {
        assert!(AudioBuffer::Shorts(&[]).is_empty());
        assert!(AudioBuffer::pcm16(&[]).to_waveform().unwrap().is_empty());
    }
}
