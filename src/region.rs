use std::{io, mem, ops::Range, ptr, ptr::NonNull};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_READ, PROT_WRITE};

use crate::{
  align,
  block::{Block, GRANULE, Header, MAX_UNITS},
  error::GcError,
};

pub const WORD: usize = mem::size_of::<usize>();

pub fn page_size() -> usize {
  // SAFETY: sysconf has no preconditions.
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
  if size <= 0 { 4096 } else { size as usize }
}

/// Address space owned by one heap.
///
/// The whole range is mapped once with `MAP_NORESERVE` and handed out from
/// the bottom through an emulated program break, so the arena is always one
/// contiguous run of granules starting at `base`.
///
/// ```text
///   base                       base + brk           base + reserved
///    │                              │                        │
///    ▼                              ▼                        ▼
///    ┌────┬─────────────────────────┬────────────────────────┐
///    │ S  │  blocks (free or used)  │      not yet handed out │
///    └────┴─────────────────────────┴────────────────────────┘
///     granule 0 = free-list sentinel
/// ```
pub struct Region {
  base: NonNull<u8>,
  reserved: usize,
  brk: usize,
}

impl Region {
  pub fn reserve(bytes: usize) -> Result<Self, GcError> {
    let page = page_size();
    let reserved = align!(bytes.max(page), page);

    if reserved / GRANULE > MAX_UNITS {
      return Err(GcError::ReservationTooLarge { bytes: reserved });
    }

    // SAFETY: anonymous private mapping, no file descriptor involved.
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        reserved,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS | MAP_NORESERVE,
        -1,
        0,
      )
    };

    if addr == MAP_FAILED {
      return Err(GcError::Reserve {
        bytes: reserved,
        source: io::Error::last_os_error(),
      });
    }

    let base = NonNull::new(addr.cast::<u8>()).ok_or_else(|| GcError::Reserve {
      bytes: reserved,
      source: io::Error::from(io::ErrorKind::AddrNotAvailable),
    })?;

    log::debug!("[gc] reserved {reserved} bytes at {:p}", base);

    Ok(Self { base, reserved, brk: 0 })
  }

  /// Moves the break up by `increment` bytes and returns the old break as
  /// an offset from `base`. `None` once the reservation is exhausted.
  pub fn sbrk(
    &mut self,
    increment: usize,
  ) -> Option<usize> {
    let old = self.brk;
    let new = old.checked_add(increment)?;

    if new > self.reserved {
      return None;
    }

    self.brk = new;
    Some(old)
  }

  pub fn brk(&self) -> usize {
    self.brk
  }

  pub fn reserved(&self) -> usize {
    self.reserved
  }

  pub fn base(&self) -> usize {
    self.base.as_ptr() as usize
  }

  /// Addresses currently handed out by the break.
  pub fn span(&self) -> Range<usize> {
    self.base()..self.base() + self.brk
  }

  pub fn address_of(
    &self,
    block: Block,
  ) -> usize {
    self.base() + block.index() * GRANULE
  }

  pub fn header(
    &self,
    block: Block,
  ) -> Header {
    let ptr = self.header_ptr(block);
    // SAFETY: in bounds and granule aligned, see `header_ptr`.
    unsafe { ptr.read() }
  }

  pub fn set_header(
    &mut self,
    block: Block,
    header: Header,
  ) {
    let ptr = self.header_ptr(block);
    // SAFETY: in bounds and granule aligned, see `header_ptr`.
    unsafe { ptr.write(header) }
  }

  /// Reads the word stored at `addr`, which must be word aligned and lie
  /// below the break.
  pub fn read_word(
    &self,
    addr: usize,
  ) -> usize {
    assert!(addr % WORD == 0 && self.span().contains(&addr) && addr + WORD <= self.span().end);
    let offset = addr - self.base();
    // SAFETY: checked above; the mapping stays alive as long as `self`.
    unsafe { self.base.as_ptr().add(offset).cast::<usize>().read() }
  }

  fn header_ptr(
    &self,
    block: Block,
  ) -> *mut Header {
    let offset = block.index() * GRANULE;
    assert!(offset + GRANULE <= self.brk, "block {block:?} lies beyond the break");
    // SAFETY: offset is below the break, and the base is page aligned.
    unsafe { self.base.as_ptr().add(offset).cast::<Header>() }
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    // SAFETY: `base` and `reserved` describe exactly the mapping made in
    // `reserve`, and nothing borrows from it past this point.
    unsafe {
      libc::munmap(self.base.as_ptr().cast(), self.reserved);
    }
  }
}
