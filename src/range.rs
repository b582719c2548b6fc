//! Lazy enumeration of every address inside a CIDR block.

use crate::codec::CidrBlock;

/// Iterator over all addresses of one block, network and broadcast
/// addresses included.
///
/// The cursor is 64-bit so that a /0 block terminates after 2^32
/// addresses instead of wrapping around forever.
#[derive(Debug)]
pub struct AddrIter {
    cursor: u64,
    last: u64,
}

impl CidrBlock {
    /// Iterates every address in the block, starting at the masked
    /// network address and ascending one address at a time.
    ///
    /// Each call derives a fresh cursor from the block, so the
    /// sequence is restartable and deterministic.
    #[must_use]
    pub fn iter(&self) -> AddrIter {
        AddrIter {
            cursor: u64::from(self.network()),
            last: u64::from(self.broadcast()),
        }
    }
}

impl Iterator for AddrIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.cursor > self.last {
            return None;
        }
        let addr = self.cursor as u32;
        self.cursor += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.last + 1 - self.cursor;
        usize::try_from(remaining).map_or((usize::MAX, None), |n| (n, Some(n)))
    }
}
