//! ICC profile extraction and embedding for JPEG streams.
//!
//! JPEG carries ICC profiles in APP2 segments. Each segment holds one chunk:
//!
//! ```text
//! offset  size  field
//! 0       2     marker FF E2
//! 2       2     segment length, big-endian, counts itself (2 + 14 + n)
//! 4       12    tag "ICC_PROFILE\0"
//! 16      1     chunk sequence number, 1-based
//! 17      1     total chunk count
//! 18      n     profile bytes, n <= 65519
//! ```
//!
//! The segment length field is a `u16`, so the payload is capped at
//! `65535 - 2 - 14 = 65519` bytes and a profile spans at most 255 segments.
//! Re-encoding an image through the `image` crate drops these segments;
//! [`embed`] puts them back right after SOI.

use crate::error::{IccError, IccResult};

/// Start-of-image marker.
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// APP2 marker byte (after 0xFF).
pub const APP2: u8 = 0xE2;

/// Tag opening every ICC APP2 segment.
pub const ICC_TAG: &[u8; 12] = b"ICC_PROFILE\0";

/// Tag + sequence byte + count byte.
pub const ICC_HEADER_LEN: usize = ICC_TAG.len() + 2;

/// Largest profile payload per segment.
pub const MAX_CHUNK_PAYLOAD: usize = u16::MAX as usize - 2 - ICC_HEADER_LEN;

const MAX_CHUNKS: usize = u8::MAX as usize;

/// Start of scan: entropy-coded data follows, no more metadata segments.
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;

/// Markers without a length field.
fn is_standalone(marker: u8) -> bool {
    matches!(marker, 0x01 | 0xD0..=0xD7 | 0xD8)
}

/// Extract the ICC profile from a JPEG byte stream.
///
/// Returns `Ok(None)` when no profile is present or its chunks do not form a
/// complete sequence.
pub fn extract(data: &[u8]) -> IccResult<Option<Vec<u8>>> {
    if !data.starts_with(&SOI) {
        return Err(IccError::NotJpeg);
    }

    // (sequence, declared count, payload)
    let mut chunks: Vec<(u8, u8, &[u8])> = Vec::new();
    let mut pos = SOI.len();

    loop {
        // Skip fill bytes before a marker
        while pos < data.len() && data[pos] == 0xFF && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            break;
        }
        if data[pos] != 0xFF {
            // Not positioned on a marker; nothing more we can parse safely
            break;
        }

        let marker = data[pos + 1];
        if marker == SOS || marker == EOI {
            break;
        }
        if is_standalone(marker) {
            pos += 2;
            continue;
        }

        let len_at = pos + 2;
        if len_at + 2 > data.len() {
            return Err(IccError::Truncated(pos));
        }
        let length = u16::from_be_bytes([data[len_at], data[len_at + 1]]) as usize;
        if length < 2 || len_at + length > data.len() {
            return Err(IccError::Truncated(pos));
        }
        let body = &data[len_at + 2..len_at + length];

        if marker == APP2 && body.len() >= ICC_HEADER_LEN && body.starts_with(ICC_TAG) {
            let seq = body[ICC_TAG.len()];
            let count = body[ICC_TAG.len() + 1];
            chunks.push((seq, count, &body[ICC_HEADER_LEN..]));
        }

        pos = len_at + length;
    }

    Ok(assemble(chunks))
}

/// Order chunks by sequence number and join them; `None` on any gap.
fn assemble(mut chunks: Vec<(u8, u8, &[u8])>) -> Option<Vec<u8>> {
    if chunks.is_empty() {
        return None;
    }
    chunks.sort_by_key(|(seq, _, _)| *seq);

    let count = chunks[0].1;
    if count == 0 || chunks.len() != count as usize {
        return None;
    }

    let mut profile = Vec::with_capacity(chunks.iter().map(|(_, _, p)| p.len()).sum());
    for (i, (seq, declared, payload)) in chunks.into_iter().enumerate() {
        if seq as usize != i + 1 || declared != count {
            return None;
        }
        profile.extend_from_slice(payload);
    }
    Some(profile)
}

/// Number of APP2 segments needed for a profile of `len` bytes.
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(MAX_CHUNK_PAYLOAD)
}

/// Embed `profile` into a freshly encoded JPEG.
///
/// Output is SOI, one APP2 segment per chunk, then every byte of `jpeg`
/// after its SOI, unchanged. An empty profile returns the input as is.
pub fn embed(jpeg: &[u8], profile: &[u8]) -> IccResult<Vec<u8>> {
    if !jpeg.starts_with(&SOI) {
        return Err(IccError::NotJpeg);
    }
    if profile.is_empty() {
        return Ok(jpeg.to_vec());
    }

    let count = chunk_count(profile.len());
    if count > MAX_CHUNKS {
        return Err(IccError::ProfileTooLarge(profile.len()));
    }

    let mut out = Vec::with_capacity(jpeg.len() + profile.len() + count * (4 + ICC_HEADER_LEN));
    out.extend_from_slice(&SOI);

    for (i, chunk) in profile.chunks(MAX_CHUNK_PAYLOAD).enumerate() {
        // Fits: chunk.len() <= MAX_CHUNK_PAYLOAD keeps this <= u16::MAX
        let segment_len = (2 + ICC_HEADER_LEN + chunk.len()) as u16;
        out.extend_from_slice(&[0xFF, APP2]);
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(ICC_TAG);
        out.push((i + 1) as u8);
        out.push(count as u8);
        out.extend_from_slice(chunk);
    }

    out.extend_from_slice(&jpeg[SOI.len()..]);
    Ok(out)
}
