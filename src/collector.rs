use std::{
  io::{self, Write},
  process,
  ptr::NonNull,
};

use crate::{
  config::{HeapCreateInfo, Propagation},
  error::GcError,
  heap::{BlockInfo, Heap, HeapStats},
  roots::{ExplicitRoots, RootSource},
  scan::Scanner,
};

/// What one call to [`Gc::collect`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Collection {
  pub marked_from_roots: usize,
  pub marked_from_heap: usize,
  pub heap_passes: usize,
  pub retained: usize,
  pub reclaimed: usize,
  pub reclaimed_bytes: usize,
}

/// A heap together with the roots it is collected from.
pub struct Gc<R: RootSource = ExplicitRoots> {
  heap: Heap,
  roots: R,
  propagation: Propagation,
  initialized: bool,
}

impl<R: RootSource> Gc<R> {
  pub fn new(
    info: HeapCreateInfo,
    roots: R,
  ) -> Result<Self, GcError> {
    Ok(Self {
      heap: Heap::new(&info)?,
      roots,
      propagation: info.propagation,
      initialized: false,
    })
  }

  /// Like [`Gc::try_init`], but a failure to find the roots aborts the
  /// process: without them nothing can be collected safely.
  pub fn init(&mut self) {
    if let Err(err) = self.try_init() {
      log::error!("[gc] init failed: {err}");
      process::abort();
    }
  }

  /// Discovers the roots and sets up empty free and used lists. Only the
  /// first successful call does anything.
  pub fn try_init(&mut self) -> Result<(), GcError> {
    if self.initialized {
      return Ok(());
    }

    self.roots.init()?;
    self.heap.reset()?;
    self.initialized = true;
    Ok(())
  }

  /// Returns a payload of at least `bytes`. The memory is only reclaimed
  /// by a later [`Gc::collect`] that cannot reach it.
  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, GcError> {
    if !self.initialized {
      return Err(GcError::NotInitialized);
    }

    let block = self.heap.allocate(bytes)?;
    Ok(self.heap.payload(block))
  }

  pub fn collect(&mut self) -> Collection {
    if self.heap.usedp.is_none() {
      return Collection::default();
    }

    let mut scanner = Scanner::new(&mut self.heap);
    self.roots.scan_statics(&mut scanner);
    self.roots.scan_stack(&mut scanner);
    let marked_from_roots = scanner.marked();

    let mut heap_passes = 1;
    let mut marked_from_heap = self.heap.scan_heap();
    if self.propagation == Propagation::FixedPoint {
      let mut newly = marked_from_heap;
      while newly > 0 {
        newly = self.heap.scan_heap();
        marked_from_heap += newly;
        heap_passes += 1;
      }
    }

    let swept = self.heap.sweep();
    let collection = Collection {
      marked_from_roots,
      marked_from_heap,
      heap_passes,
      retained: swept.retained,
      reclaimed: swept.reclaimed,
      reclaimed_bytes: swept.reclaimed_bytes,
    };

    log::debug!("[gc] collect: {collection:?}");
    collection
  }

  /// Whether `ptr` points into the payload of a block that is still
  /// allocated.
  pub fn is_allocated(
    &self,
    ptr: *const u8,
  ) -> bool {
    self.heap.block_containing(ptr as usize, None).is_some()
  }

  pub fn stats(&self) -> HeapStats {
    self.heap.stats()
  }

  /// Used blocks in list order, head first.
  pub fn used_blocks(&self) -> Vec<BlockInfo> {
    self.heap.used().map(|b| self.heap.info(b)).collect()
  }

  /// Free blocks in address order.
  pub fn free_blocks(&self) -> Vec<BlockInfo> {
    self.heap.free().map(|b| self.heap.info(b)).collect()
  }

  pub fn write_used<W: Write>(
    &self,
    out: &mut W,
  ) -> io::Result<()> {
    write_blocks(out, "used", &self.used_blocks())
  }

  pub fn write_free<W: Write>(
    &self,
    out: &mut W,
  ) -> io::Result<()> {
    write_blocks(out, "free", &self.free_blocks())
  }

  pub fn print_used(&self) {
    if let Err(err) = self.write_used(&mut io::stdout().lock()) {
      log::warn!("[gc] failed to print used list: {err}");
    }
  }

  pub fn print_free(&self) {
    if let Err(err) = self.write_free(&mut io::stdout().lock()) {
      log::warn!("[gc] failed to print free list: {err}");
    }
  }

  pub fn roots(&self) -> &R {
    &self.roots
  }

  pub fn roots_mut(&mut self) -> &mut R {
    &mut self.roots
  }
}

fn write_blocks<W: Write>(
  out: &mut W,
  list: &str,
  blocks: &[BlockInfo],
) -> io::Result<()> {
  if blocks.is_empty() {
    return writeln!(out, "\n{list} list is empty");
  }

  writeln!(out, "\n========== {list} list ==========")?;
  for block in blocks {
    writeln!(out, "address: {:#x}, size: {}", block.address, block.units)?;
  }
  Ok(())
}
