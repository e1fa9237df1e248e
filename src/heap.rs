use std::ptr::NonNull;

use crate::{
  block::{Block, GRANULE, Header, SENTINEL},
  config::HeapCreateInfo,
  error::GcError,
  region::Region,
};

/// Address and size of one block, as shown by the diagnostic dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the block header.
  pub address: usize,
  /// Size in granules, header included.
  pub units: usize,
}

impl BlockInfo {
  pub fn payload(&self) -> usize {
    self.address + GRANULE
  }

  pub fn payload_bytes(&self) -> usize {
    (self.units - 1) * GRANULE
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes taken from the reservation, not counting the sentinel.
  pub acquired_bytes: usize,
  pub free_bytes: usize,
  pub used_bytes: usize,
  pub header_bytes: usize,
  pub free_blocks: usize,
  pub used_blocks: usize,
}

/// The free list, the used list and the arena both live in.
pub struct Heap {
  pub(crate) region: Region,
  /// Where the last search or insertion stopped.
  pub(crate) freep: Block,
  /// Head of the circular used list.
  pub(crate) usedp: Option<Block>,
  pub(crate) chunk_units: usize,
}

impl Heap {
  pub fn new(info: &HeapCreateInfo) -> Result<Self, GcError> {
    let region = Region::reserve(info.reserve)?;

    Ok(Self {
      region,
      freep: SENTINEL,
      usedp: None,
      chunk_units: info.chunk.div_ceil(GRANULE).max(1),
    })
  }

  /// Commits the sentinel and empties both lists.
  pub(crate) fn reset(&mut self) -> Result<(), GcError> {
    if self.region.brk() == 0 {
      self
        .region
        .sbrk(GRANULE)
        .ok_or(GcError::OutOfMemory { requested: GRANULE })?;
    }

    self.region.set_header(SENTINEL, Header::new(0, SENTINEL));
    self.freep = SENTINEL;
    self.usedp = None;
    Ok(())
  }

  pub(crate) fn is_initialized(&self) -> bool {
    self.region.brk() > 0
  }

  pub(crate) fn size(
    &self,
    block: Block,
  ) -> usize {
    self.region.header(block).size()
  }

  pub(crate) fn next(
    &self,
    block: Block,
  ) -> Block {
    self.region.header(block).next
  }

  pub(crate) fn set_next(
    &mut self,
    block: Block,
    next: Block,
  ) {
    let mut header = self.region.header(block);
    header.next = next;
    self.region.set_header(block, header);
  }

  pub(crate) fn payload(
    &self,
    block: Block,
  ) -> NonNull<u8> {
    let addr = self.region.address_of(block) + GRANULE;
    // SAFETY: the region base is never null, so neither is any address above it.
    unsafe { NonNull::new_unchecked(addr as *mut u8) }
  }

  /// Whether `addr` falls inside the payload of `block`. Interior addresses
  /// count, the address one past the end does not.
  pub(crate) fn payload_contains(
    &self,
    block: Block,
    addr: usize,
  ) -> bool {
    let start = self.region.address_of(block) + GRANULE;
    let end = start + (self.size(block) - 1) * GRANULE;
    start <= addr && addr < end
  }

  pub(crate) fn info(
    &self,
    block: Block,
  ) -> BlockInfo {
    BlockInfo {
      address: self.region.address_of(block),
      units: self.size(block),
    }
  }

  /// Free blocks in address order, sentinel excluded.
  pub(crate) fn free(&self) -> impl Iterator<Item = Block> + '_ {
    let first = if self.is_initialized() { self.next(SENTINEL) } else { SENTINEL };
    std::iter::successors(Some(first), |&b| Some(self.next(b))).take_while(|&b| b != SENTINEL)
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      acquired_bytes: self.region.brk().saturating_sub(GRANULE),
      ..HeapStats::default()
    };

    for block in self.free() {
      stats.free_blocks += 1;
      stats.free_bytes += (self.size(block) - 1) * GRANULE;
    }

    for block in self.used() {
      stats.used_blocks += 1;
      stats.used_bytes += (self.size(block) - 1) * GRANULE;
    }

    stats.header_bytes = (stats.free_blocks + stats.used_blocks) * GRANULE;
    stats
  }
}
