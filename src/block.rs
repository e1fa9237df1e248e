use std::mem;

/// Size in bytes of one granule. Every block is a whole number of granules
/// and the header occupies exactly the first one.
pub const GRANULE: usize = mem::size_of::<Header>();

/// Largest block size the header can describe.
pub const MAX_UNITS: usize = u32::MAX as usize;

const MARKED: u32 = 1;

/// Granule index of a block header inside the arena.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(usize);

/// Zero-size anchor of the free list. Always lives in granule 0.
pub const SENTINEL: Block = Block(0);

impl Block {
  pub const fn at(index: usize) -> Self {
    Self(index)
  }

  pub const fn index(self) -> usize {
    self.0
  }

  pub const fn offset(
    self,
    units: usize,
  ) -> Self {
    Self(self.0 + units)
  }
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Header {
  size: u32,
  flags: u32,
  pub next: Block,
}

impl Header {
  pub fn new(
    size: usize,
    next: Block,
  ) -> Self {
    debug_assert!(size <= MAX_UNITS);
    Self {
      size: size as u32,
      flags: 0,
      next,
    }
  }

  pub fn size(&self) -> usize {
    self.size as usize
  }

  pub fn is_marked(&self) -> bool {
    self.flags & MARKED != 0
  }

  pub fn set_marked(
    &mut self,
    marked: bool,
  ) {
    if marked {
      self.flags |= MARKED;
    } else {
      self.flags &= !MARKED;
    }
  }
}

/// Granules needed to serve a request of `bytes`, header included.
pub fn units_for(bytes: usize) -> Option<usize> {
  let units = bytes.div_ceil(GRANULE).checked_add(1)?;
  (units <= MAX_UNITS).then_some(units)
}
