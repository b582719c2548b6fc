//! Conversions between dotted-quad IPv4 text, 32-bit integers, CIDR
//! blocks and inclusive address ranges.
//!
//! The integer form of an address is the big-endian packing of its four
//! octets, so ordinary `u32` ordering and arithmetic correspond to
//! address ordering and stepping.

use std::fmt;
use std::str::FromStr;

use crate::error::ScanError;

/// A CIDR block: base address plus prefix length.
///
/// The base is not required to be masked on input. Output-producing
/// operations ([`Display`](fmt::Display), [`range_to_cidrs`]) always
/// emit the masked network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    /// Base address in integer form.
    pub base: u32,
    /// Prefix length, 0..=32.
    pub prefix: u8,
}

impl CidrBlock {
    /// Builds a block from a base address and a prefix length.
    #[must_use]
    pub const fn new(base: u32, prefix: u8) -> Self {
        Self { base, prefix }
    }

    /// Network mask for this block's prefix length.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        !host_mask(self.prefix)
    }

    /// Base address with all host bits cleared.
    #[must_use]
    pub const fn network(&self) -> u32 {
        self.base & self.mask()
    }

    /// Highest address contained in the block.
    #[must_use]
    pub const fn broadcast(&self) -> u32 {
        self.network() | host_mask(self.prefix)
    }

    /// Number of addresses the block contains. A /0 holds 2^32
    /// addresses, hence the u64.
    #[must_use]
    pub const fn size(&self) -> u64 {
        1u64 << (32 - self.prefix)
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", to_text(self.network()), self.prefix)
    }
}

impl FromStr for CidrBlock {
    type Err = ScanError;

    /// Parses `a.b.c.d/p`. A missing `/`, a non-numeric prefix or a
    /// prefix above 32 is rejected; the dotted-quad part follows the
    /// lenient rules of [`to_integer`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| ScanError::Parse { input: s.to_owned() })?;
        let base = to_integer(addr)?;
        let prefix = prefix
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| ScanError::Parse { input: s.to_owned() })?;

        Ok(Self { base, prefix })
    }
}

/// An inclusive, closed interval of addresses with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Range {
    /// First address of the interval.
    pub start: u32,
    /// Last address of the interval.
    pub end: u32,
}

impl fmt::Display for Ipv4Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", to_text(self.start), to_text(self.end))
    }
}

/// All-ones host part for a prefix length, e.g. `0x0000_FFFF` for /16.
const fn host_mask(prefix: u8) -> u32 {
    // u64 shift so /0 yields all ones and /32 yields zero.
    (u32::MAX as u64 >> prefix) as u32
}

/// Parses dotted-quad text into the integer form.
///
/// Splits on `.` into at most four components. Fewer than four are
/// treated as zero-filled trailing octets, so `"10.1"` parses as
/// `10.1.0.0`. Any component that is not a decimal number in 0..=255
/// fails with [`ScanError::Parse`]; this includes a fifth octet, since
/// the limited split leaves it glued to the fourth.
pub fn to_integer(text: &str) -> Result<u32, ScanError> {
    let mut octets = [0u8; 4];
    for (i, part) in text.splitn(4, '.').enumerate() {
        octets[i] = part
            .trim()
            .parse::<u8>()
            .map_err(|_| ScanError::Parse {
                input: text.to_owned(),
            })?;
    }

    Ok(u32::from_be_bytes(octets))
}

/// Formats the integer form as dotted-quad text, most-significant
/// octet first.
#[must_use]
pub fn to_text(addr: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        addr >> 24,
        (addr >> 16) & 0xFF,
        (addr >> 8) & 0xFF,
        addr & 0xFF
    )
}

/// Decomposes the inclusive range `[start, end]` into the minimal
/// ordered sequence of CIDR blocks covering exactly that range.
///
/// Greedy: from the current cursor, emit the largest block the cursor
/// is aligned to that still fits in the remaining span, then advance
/// past it. Ties always prefer the larger aligned block, so the result
/// is deterministic.
pub fn range_to_cidrs(start: u32, end: u32) -> Result<Vec<CidrBlock>, ScanError> {
    if start > end {
        return Err(ScanError::InvalidRange {
            start: to_text(start),
            end: to_text(end),
        });
    }

    let mut blocks = Vec::new();
    let mut cursor = u64::from(start);
    let end = u64::from(end);

    // Cursor and span are u64 so the full address space neither
    // overflows the advance nor the remaining-span computation.
    while cursor <= end {
        let align = 32u32.saturating_sub(cursor.trailing_zeros());
        let span = end - cursor + 1;
        let fit = 32 - span.ilog2();
        let prefix = align.max(fit) as u8;

        blocks.push(CidrBlock::new(cursor as u32, prefix));
        cursor += 1u64 << (32 - prefix);
    }

    Ok(blocks)
}

/// Computes the tight enclosing range of a set of CIDR blocks: the
/// minimum base paired with the maximum block end, where a block ends
/// at `base | (0xFFFF_FFFF >> prefix)`.
///
/// Bases are taken as-is, without re-masking. For non-contiguous
/// inputs the result over-covers the gaps between blocks; callers that
/// care about exact membership must keep the original block list.
#[must_use]
pub fn cidrs_to_range(blocks: &[CidrBlock]) -> Ipv4Range {
    let mut start = 0u32;
    let mut end = 0u32;

    for block in blocks {
        if start == 0 || start > block.base {
            start = block.base;
        }
        let block_end = block.base | host_mask(block.prefix);
        if end < block_end {
            end = block_end;
        }
    }

    Ipv4Range { start, end }
}
