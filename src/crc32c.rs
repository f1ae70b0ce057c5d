//! Masked CRC32C (Castagnoli) for the framed stream format.
//!
//! Every compressed and uncompressed chunk in the stream format carries a
//! 4-byte checksum of its *uncompressed* payload: CRC32C run through the
//! Snappy mask rotation (see [`mask`]), which keeps checksum bytes from
//! colliding with the magic constants of formats that embed Snappy streams.
//!
//! Two implementation tiers, selected once at first use:
//!
//! 1. The SSE 4.2 `crc32` instruction, eating 8 bytes per step with a
//!    4-byte / 1-byte ladder for the tail.
//! 2. A slice-by-16 table: 16×256 entries, const-generated; the loop body
//!    folds four little-endian words through four disjoint table slices per
//!    16-byte iteration.
//!
//! The streaming contract is `append(prev, bytes) -> crc`, associative over
//! concatenation: `append(append(0, a), b) == append(0, a ++ b)`.

use once_cell::sync::Lazy;

/// Reflected Castagnoli polynomial.
const POLY: u32 = 0x82F6_3B78;

/// Offset added by [`mask`] after the rotation.
const MASK_DELTA: u32 = 0xA282_EAD8;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// CRC32C of `data` starting from the zero checksum.
#[inline]
pub fn crc32c(data: &[u8]) -> u32 {
    append(0, data)
}

/// Extend a previous checksum with more bytes.
#[inline]
pub fn append(crc: u32, data: &[u8]) -> u32 {
    !(*UPDATE)(!crc, data)
}

/// The Snappy CRC mask: rotate right by 15 and add a constant.
///
/// Applied to every chunk checksum in the stream format.
#[inline]
pub const fn mask(crc: u32) -> u32 {
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Masked CRC32C of `data` — the value stored on the wire.
#[inline]
pub fn masked_crc32c(data: &[u8]) -> u32 {
    mask(crc32c(data))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tier dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Raw shift-register update (no pre/post inversion), picked once.
static UPDATE: Lazy<fn(u32, &[u8]) -> u32> = Lazy::new(|| {
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("sse4.2") {
            return update_hw;
        }
    }
    update_slice16
});

// ─────────────────────────────────────────────────────────────────────────────
// Tier 1: hardware crc32 instruction (x86_64)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(target_arch = "x86_64")]
fn update_hw(crc: u32, data: &[u8]) -> u32 {
    // SAFETY: only installed in UPDATE after is_x86_feature_detected!("sse4.2").
    unsafe { update_sse42(crc, data) }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
unsafe fn update_sse42(crc: u32, data: &[u8]) -> u32 {
    use core::arch::x86_64::{_mm_crc32_u32, _mm_crc32_u64, _mm_crc32_u8};

    let mut crc = crc as u64;
    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        crc = _mm_crc32_u64(crc, word);
    }
    let mut crc = crc as u32;
    let rest = chunks.remainder();
    let mut tail = rest.chunks_exact(4);
    for chunk in &mut tail {
        let word = u32::from_le_bytes(chunk.try_into().unwrap());
        crc = _mm_crc32_u32(crc, word);
    }
    for &b in tail.remainder() {
        crc = _mm_crc32_u8(crc, b);
    }
    crc
}

// ─────────────────────────────────────────────────────────────────────────────
// Tier 2: slice-by-16 tables
// ─────────────────────────────────────────────────────────────────────────────

const fn make_tables() -> [[u32; 256]; 16] {
    let mut t = [[0u32; 256]; 16];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            bit += 1;
        }
        t[0][i] = crc;
        i += 1;
    }
    let mut k = 1;
    while k < 16 {
        let mut i = 0;
        while i < 256 {
            let prev = t[k - 1][i];
            t[k][i] = t[0][(prev & 0xff) as usize] ^ (prev >> 8);
            i += 1;
        }
        k += 1;
    }
    t
}

static TABLES: [[u32; 256]; 16] = make_tables();

fn update_slice16(mut crc: u32, data: &[u8]) -> u32 {
    let t = &TABLES;
    let mut chunks = data.chunks_exact(16);
    for b in &mut chunks {
        let w0 = u32::from_le_bytes(b[0..4].try_into().unwrap()) ^ crc;
        let w1 = u32::from_le_bytes(b[4..8].try_into().unwrap());
        let w2 = u32::from_le_bytes(b[8..12].try_into().unwrap());
        let w3 = u32::from_le_bytes(b[12..16].try_into().unwrap());
        crc = t[15][(w0 & 0xff) as usize]
            ^ t[14][(w0 >> 8 & 0xff) as usize]
            ^ t[13][(w0 >> 16 & 0xff) as usize]
            ^ t[12][(w0 >> 24) as usize]
            ^ t[11][(w1 & 0xff) as usize]
            ^ t[10][(w1 >> 8 & 0xff) as usize]
            ^ t[9][(w1 >> 16 & 0xff) as usize]
            ^ t[8][(w1 >> 24) as usize]
            ^ t[7][(w2 & 0xff) as usize]
            ^ t[6][(w2 >> 8 & 0xff) as usize]
            ^ t[5][(w2 >> 16 & 0xff) as usize]
            ^ t[4][(w2 >> 24) as usize]
            ^ t[3][(w3 & 0xff) as usize]
            ^ t[2][(w3 >> 8 & 0xff) as usize]
            ^ t[1][(w3 >> 16 & 0xff) as usize]
            ^ t[0][(w3 >> 24) as usize];
    }
    for &b in chunks.remainder() {
        crc = t[0][((crc ^ b as u32) & 0xff) as usize] ^ (crc >> 8);
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference vectors; the first is the classic CRC32C check value.
    #[test]
    fn reference_vectors() {
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
        assert_eq!(crc32c(b"1234567890123456"), 0x9AA4_287F);
        assert_eq!(crc32c(b"123456789012345612345678901234"), 0xECC7_4934);
        assert_eq!(crc32c(b"12345678901234561234567890123456"), 0xCD48_6B4B);
    }

    /// Both tiers must agree on awkward lengths and alignments.
    #[test]
    fn tiers_agree() {
        let data: Vec<u8> = (0..1024u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
        for start in [0usize, 1, 3, 7] {
            for len in [0usize, 1, 4, 7, 8, 15, 16, 17, 63, 64, 100, 1000] {
                let slice = &data[start..start + len];
                let sliced = !update_slice16(!0, slice);
                assert_eq!(crc32c(slice), sliced, "start={start} len={len}");
                #[cfg(target_arch = "x86_64")]
                if std::is_x86_feature_detected!("sse4.2") {
                    assert_eq!(!update_hw(!0, slice), sliced, "hw start={start} len={len}");
                }
            }
        }
    }

    /// `append` is associative over concatenation at every split point.
    #[test]
    fn append_concatenation() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let whole = crc32c(data);
        for split in 0..=data.len() {
            let (a, b) = data.split_at(split);
            assert_eq!(append(append(0, a), b), whole, "split={split}");
        }
    }

    #[test]
    fn mask_rotation() {
        assert_eq!(mask(0), MASK_DELTA);
        // mask is injective on these: distinct inputs stay distinct.
        assert_ne!(mask(crc32c(b"a")), mask(crc32c(b"b")));
        assert_eq!(masked_crc32c(b"abc"), mask(crc32c(b"abc")));
    }
}
