//! Bit-level packing primitives.
//!
//! Elements are written most-significant-bit first and laid out back to back
//! from the top bit of byte 0, with no padding between elements. Only the
//! final byte may carry unused (zero) low bits, so a buffer always tracks its
//! exact length in bits.

/// An immutable, bit-exact buffer of packed elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PackedBuffer {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl PackedBuffer {
    /// Wraps raw bytes holding `bit_len` meaningful bits.
    ///
    /// Returns `None` if `bytes` is not exactly `ceil(bit_len / 8)` long.
    /// Unused trailing bits are cleared so equal contents compare equal.
    pub fn from_bytes(mut bytes: Vec<u8>, bit_len: usize) -> Option<Self> {
        if bytes.len() != bit_len.div_ceil(8) {
            return None;
        }
        let tail = bit_len % 8;
        if tail != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xFFu8 << (8 - tail);
            }
        }
        Some(PackedBuffer { bytes, bit_len })
    }

    /// Backing bytes, including any zero padding in the final byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Iterates the buffer as consecutive `width`-bit words.
    pub fn words(&self, width: u32) -> BitReader<'_> {
        BitReader::new(self, width)
    }

    /// Returns the bit at position `index`, counting from the start.
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some(self.bytes[index / 8] & (0x80 >> (index % 8)) != 0)
    }
}

/// Append-only bit cursor producing a `PackedBuffer`.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with room for `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        BitWriter {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            bit_len: 0,
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Appends the low `width` bits of `value`, most significant first.
    ///
    /// `width` must be in `1..=64`; higher bits of `value` are ignored.
    pub fn write(&mut self, value: u64, width: u32) {
        debug_assert!((1..=64).contains(&width), "bad width {}", width);

        // Byte-aligned fast path for 8/16/32/64-bit elements.
        if self.bit_len % 8 == 0 && width % 8 == 0 {
            let n = (width / 8) as usize;
            self.bytes.extend_from_slice(&value.to_be_bytes()[8 - n..]);
            self.bit_len += width as usize;
            return;
        }

        let mut remaining = width;
        while remaining > 0 {
            let offset = (self.bit_len % 8) as u32;
            if offset == 0 {
                self.bytes.push(0);
            }
            let free = 8 - offset;
            let take = free.min(remaining);
            let chunk = ((value >> (remaining - take)) & low_mask(take)) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= chunk << (free - take);
            self.bit_len += take as usize;
            remaining -= take;
        }
    }

    pub fn finish(self) -> PackedBuffer {
        PackedBuffer {
            bytes: self.bytes,
            bit_len: self.bit_len,
        }
    }
}

/// Iterator over fixed-width words of a `PackedBuffer`.
///
/// Stops when fewer than `width` bits remain.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    bit_len: usize,
    pos: usize,
    width: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a PackedBuffer, width: u32) -> Self {
        debug_assert!((1..=64).contains(&width), "bad width {}", width);
        BitReader {
            bytes: &buffer.bytes,
            bit_len: buffer.bit_len,
            pos: 0,
            width,
        }
    }

    fn remaining_words(&self) -> usize {
        (self.bit_len - self.pos) / self.width as usize
    }
}

impl Iterator for BitReader<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.width == 0 || self.remaining_words() == 0 {
            return None;
        }

        if self.pos % 8 == 0 && self.width % 8 == 0 {
            let start = self.pos / 8;
            let n = (self.width / 8) as usize;
            let word = self.bytes[start..start + n]
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | b as u64);
            self.pos += self.width as usize;
            return Some(word);
        }

        let mut out = 0u64;
        let mut remaining = self.width;
        while remaining > 0 {
            let byte = self.bytes[self.pos / 8];
            let avail = 8 - (self.pos % 8) as u32;
            let take = avail.min(remaining);
            let chunk = (byte as u64 >> (avail - take)) & low_mask(take);
            out = (out << take) | chunk;
            self.pos += take as usize;
            remaining -= take;
        }
        Some(out)
    }

    fn nth(&mut self, n: usize) -> Option<u64> {
        if self.width == 0 || n >= self.remaining_words() {
            self.pos = self.bit_len;
            return None;
        }
        self.pos += n * self.width as usize;
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.width == 0 { 0 } else { self.remaining_words() };
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitReader<'_> {}

/// Mask with the low `width` bits set. `width` may be 64.
pub fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
