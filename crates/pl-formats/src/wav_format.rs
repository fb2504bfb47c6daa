//! WAV encoding and decoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pl_ir::SampleBuffer;

use crate::FormatError;

const FORMAT_PCM: u16 = 1;
const FORMAT_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

// --- Writing ---

/// Write planar stereo f32 as 16-bit PCM. Samples are clipped to ±1.
pub fn write_wav(w: &mut impl Write, left: &[f32], right: &[f32], sample_rate: u32) -> std::io::Result<()> {
    let frames = left.len().min(right.len());
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = frames as u32 * block_align as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bits_per_sample)?;
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for (&l, &r) in left.iter().zip(right).take(frames) {
        w.write_all(&to_i16(l).to_le_bytes())?;
        w.write_all(&to_i16(r).to_le_bytes())?;
    }
    Ok(())
}

/// Encode a buffer to WAV bytes in memory.
pub fn wav_bytes(buffer: &SampleBuffer) -> Vec<u8> {
    let mut buf = Vec::with_capacity(44 + buffer.frames() * 4);
    // Writing into a Vec cannot fail.
    let _ = write_wav(&mut buf, buffer.left(), buffer.right(), buffer.sample_rate());
    buf
}

pub fn write_wav_file(path: &Path, buffer: &SampleBuffer) -> Result<(), FormatError> {
    let mut w = BufWriter::new(File::create(path)?);
    write_wav(&mut w, buffer.left(), buffer.right(), buffer.sample_rate())?;
    w.flush()?;
    Ok(())
}

fn to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&FORMAT_PCM.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

// --- Reading ---

/// Decode WAV bytes. Mono files are duplicated to both channels; channels
/// past the second are dropped.
pub fn load_wav(data: &[u8]) -> Result<SampleBuffer, FormatError> {
    let header = parse_header(data)?;
    let end = (header.data_offset + header.data_size).min(data.len());
    let raw = &data[header.data_offset..end];
    let samples = decode_samples(raw, header.encoding);
    Ok(SampleBuffer::from_interleaved(&samples, header.num_channels as usize, header.sample_rate))
}

pub fn read_wav_file(path: &Path) -> Result<SampleBuffer, FormatError> {
    let data = std::fs::read(path)?;
    load_wav(&data)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Unsigned8,
    Int16,
    Int24,
    Int32,
    Float32,
    Float64,
}

struct WavHeader {
    num_channels: u16,
    sample_rate: u32,
    encoding: Encoding,
    data_offset: usize,
    data_size: usize,
}

fn parse_header(data: &[u8]) -> Result<WavHeader, FormatError> {
    if data.len() < 12 {
        return Err(FormatError::UnexpectedEof);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidHeader);
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u16, u32, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;
        let body = pos + 8;

        if chunk_id == b"fmt " {
            if chunk_size < 16 || body + 16 > data.len() {
                return Err(FormatError::UnexpectedEof);
            }
            let mut format = read_u16_le(data, body);
            let channels = read_u16_le(data, body + 2);
            let rate = read_u32_le(data, body + 4);
            let bits = read_u16_le(data, body + 14);
            if format == FORMAT_EXTENSIBLE {
                // Sub-format GUID starts 24 bytes into the chunk; its first
                // two bytes are the plain format tag.
                if chunk_size < 40 || body + 26 > data.len() {
                    return Err(FormatError::UnexpectedEof);
                }
                format = read_u16_le(data, body + 24);
            }
            fmt = Some((format, channels, rate, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((body, chunk_size));
        }

        pos = body.saturating_add(chunk_size);
        if pos % 2 != 0 {
            pos += 1;
        }
    }

    let (format, num_channels, sample_rate, bits) = fmt.ok_or(FormatError::InvalidHeader)?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::UnexpectedEof)?;

    let encoding = match (format, bits) {
        (FORMAT_PCM, 8) => Encoding::Unsigned8,
        (FORMAT_PCM, 16) => Encoding::Int16,
        (FORMAT_PCM, 24) => Encoding::Int24,
        (FORMAT_PCM, 32) => Encoding::Int32,
        (FORMAT_FLOAT, 32) => Encoding::Float32,
        (FORMAT_FLOAT, 64) => Encoding::Float64,
        _ => return Err(FormatError::Unsupported(format!("format tag {} with {} bits", format, bits))),
    };
    if num_channels == 0 {
        return Err(FormatError::Unsupported("zero channels".into()));
    }
    if sample_rate == 0 {
        return Err(FormatError::InvalidHeader);
    }

    Ok(WavHeader { num_channels, sample_rate, encoding, data_offset, data_size })
}

fn decode_samples(raw: &[u8], encoding: Encoding) -> Vec<f32> {
    match encoding {
        Encoding::Unsigned8 => raw.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect(),
        Encoding::Int16 => raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
            .collect(),
        Encoding::Int24 => raw
            .chunks_exact(3)
            .map(|c| (i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8) as f32 / 8_388_608.0)
            .collect(),
        Encoding::Int32 => raw
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32 / 2_147_483_648.0)
            .collect(),
        Encoding::Float32 => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        Encoding::Float64 => raw
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
    }
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
