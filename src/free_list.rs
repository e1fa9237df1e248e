//! Next-fit allocation over the address-ordered free list.
//!
//! ```text
//!   freep ──▶ S ──▶ [ 1, 254 ] ──▶ [ 300, 40 ] ──▶ S   (circular, ascending)
//!
//!   allocate(16 bytes) = 2 units: the tail of the first fit is carved off
//!
//!   [ 1, 252 ][ 253, 2 ]
//!       free    returned
//! ```

use crate::{
  block::{Block, GRANULE, Header, SENTINEL, units_for},
  error::GcError,
  heap::Heap,
};

impl Heap {
  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<Block, GcError> {
    if bytes == 0 {
      return Err(GcError::ZeroSized);
    }

    let units = units_for(bytes).ok_or(GcError::OutOfMemory { requested: bytes })?;

    let mut prevp = self.freep;
    let mut p = self.next(prevp);

    loop {
      let size = self.size(p);

      if size >= units {
        if size == units {
          let next = self.next(p);
          self.set_next(prevp, next);
        } else {
          let rest = size - units;
          let next = self.next(p);
          self.region.set_header(p, Header::new(rest, next));
          p = p.offset(rest);
        }

        self.region.set_header(p, Header::new(units, SENTINEL));
        self.freep = prevp;
        self.track(p);

        log::trace!("[gc] allocate({bytes}) -> {:#x}, {units} units", self.region.address_of(p));
        return Ok(p);
      }

      if p == self.freep {
        p = self.grow(units).ok_or(GcError::OutOfMemory { requested: bytes })?;
      }

      prevp = p;
      p = self.next(p);
    }
  }

  /// Puts `bp` back into the free list, merging it with whichever neighbours
  /// touch it.
  pub(crate) fn release(
    &mut self,
    bp: Block,
  ) {
    let mut p = self.freep;

    loop {
      let next = self.next(p);
      if bp > p && bp < next {
        break;
      }
      // `p` is the highest free block: `bp` goes past the end or before the start.
      if p >= next && (bp > p || bp < next) {
        break;
      }
      p = next;
    }

    let next = self.next(p);
    let size = self.size(bp);

    if bp.offset(size) == next {
      let after = self.next(next);
      self.region.set_header(bp, Header::new(size + self.size(next), after));
    } else {
      self.region.set_header(bp, Header::new(size, next));
    }

    let p_size = self.size(p);
    if p.offset(p_size) == bp {
      let after = self.next(bp);
      self.region.set_header(p, Header::new(p_size + self.size(bp), after));
    } else {
      self.set_next(p, bp);
    }

    log::trace!("[gc] release {:#x}, {size} units", self.region.address_of(bp));
    self.freep = p;
  }

  /// Takes at least `units` more granules from the region and frees them.
  /// Returns the free-list node to resume searching from.
  pub(crate) fn grow(
    &mut self,
    units: usize,
  ) -> Option<Block> {
    let units = units.max(self.chunk_units);
    let bytes = units.checked_mul(GRANULE)?;

    let Some(brk) = self.region.sbrk(bytes) else {
      log::warn!(
        "[gc] grow({units} units) denied: {} of {} reserved bytes in use",
        self.region.brk(),
        self.region.reserved()
      );
      return None;
    };

    let block = Block::at(brk / GRANULE);
    self.region.set_header(block, Header::new(units, SENTINEL));
    log::debug!("[gc] grew heap by {bytes} bytes at {:#x}", self.region.address_of(block));

    self.release(block);
    Some(self.freep)
  }
}
