//! Conservative marking.
//!
//! Any word whose value lands inside the payload of a used block is taken
//! to be a reference to it. Nothing tells an address apart from an integer
//! that happens to have the same bits, so some garbage may be retained;
//! live data never is lost this way.

use std::ptr;

use crate::{
  block::{Block, GRANULE},
  heap::Heap,
  region::WORD,
};

/// Marks blocks hit by candidate addresses coming from the roots.
pub struct Scanner<'h> {
  heap: &'h mut Heap,
  marked: usize,
}

impl<'h> Scanner<'h> {
  pub(crate) fn new(heap: &'h mut Heap) -> Self {
    Self { heap, marked: 0 }
  }

  /// Blocks newly marked through this scanner.
  pub fn marked(&self) -> usize {
    self.marked
  }

  pub fn scan_word(
    &mut self,
    value: usize,
  ) {
    if let Some(block) = self.heap.block_containing(value, None) {
      if !self.heap.is_marked(block) {
        self.heap.mark(block);
        self.marked += 1;
      }
    }
  }

  pub fn scan_region<I>(
    &mut self,
    words: I,
  ) where
    I: IntoIterator<Item = usize>,
  {
    for value in words {
      self.scan_word(value);
    }
  }

  /// Scans the raw memory in `[start, end)` one aligned word at a time.
  ///
  /// # Safety
  ///
  /// Every word in the range must be mapped and readable for the duration
  /// of the call.
  pub unsafe fn scan_raw(
    &mut self,
    start: *const usize,
    end: *const usize,
  ) {
    let mut addr = crate::align!(start as usize, WORD);
    let end = end as usize;

    while addr + WORD <= end {
      // SAFETY: upheld by the caller.
      let value = unsafe { ptr::read_volatile(addr as *const usize) };
      self.scan_word(value);
      addr += WORD;
    }
  }
}

impl Heap {
  /// One forward pass over the used list, starting at the head. Every
  /// marked block has its payload searched for addresses of other used
  /// blocks. Returns how many blocks were newly marked.
  pub(crate) fn scan_heap(&mut self) -> usize {
    let Some(head) = self.usedp else {
      return 0;
    };

    let mut marked = 0;
    let mut block = head;

    loop {
      if self.is_marked(block) {
        marked += self.scan_payload(block);
      }

      block = self.next(block);
      if block == head {
        break;
      }
    }

    marked
  }

  fn scan_payload(
    &mut self,
    block: Block,
  ) -> usize {
    let start = self.payload(block).as_ptr() as usize;
    let end = start + (self.size(block) - 1) * GRANULE;
    let mut marked = 0;

    for addr in (start..end).step_by(WORD) {
      let value = self.region.read_word(addr);
      if let Some(target) = self.block_containing(value, Some(block)) {
        if !self.is_marked(target) {
          self.mark(target);
          marked += 1;
        }
      }
    }

    marked
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::HeapCreateInfo;

  fn heap() -> Heap {
    let mut heap = Heap::new(&HeapCreateInfo::default()).unwrap();
    heap.reset().unwrap();
    heap
  }

  fn store(
    heap: &Heap,
    from: Block,
    to: Block,
  ) {
    let target = heap.payload(to).as_ptr() as usize;
    // SAFETY: `from` is a live block with at least one payload word.
    unsafe { heap.payload(from).cast::<usize>().as_ptr().write(target) };
  }

  #[test]
  fn test_scan_region_marks_each_hit_once() {
    let mut heap = heap();
    let a = heap.allocate(16).unwrap();
    let b = heap.allocate(16).unwrap();
    let a_addr = heap.payload(a).as_ptr() as usize;

    let mut scanner = Scanner::new(&mut heap);
    scanner.scan_region([a_addr, a_addr + 8, 42, 0, usize::MAX]);

    assert_eq!(scanner.marked(), 1);
    assert!(heap.is_marked(a));
    assert!(!heap.is_marked(b));
  }

  #[test]
  fn test_scan_raw_reads_native_words() {
    let mut heap = heap();
    let a = heap.allocate(16).unwrap();
    let words = [7usize, heap.payload(a).as_ptr() as usize, 9];

    let mut scanner = Scanner::new(&mut heap);
    unsafe { scanner.scan_raw(words.as_ptr(), words.as_ptr().wrapping_add(words.len())) };

    assert_eq!(scanner.marked(), 1);
    assert!(heap.is_marked(a));
  }

  #[test]
  fn test_scan_heap_follows_marked_blocks_only() {
    let mut heap = heap();
    let a = heap.allocate(16).unwrap();
    let b = heap.allocate(16).unwrap();
    let c = heap.allocate(16).unwrap();
    store(&heap, b, c);

    assert_eq!(heap.scan_heap(), 0);

    heap.mark(a);
    store(&heap, a, b);
    // list order is a, c, b: c is marked after the pass went by it
    assert_eq!(heap.scan_heap(), 2);
    assert!(heap.is_marked(b));
    assert!(heap.is_marked(c));
  }

  #[test]
  fn test_scan_heap_skips_self_references() {
    let mut heap = heap();
    let a = heap.allocate(16).unwrap();
    heap.mark(a);
    store(&heap, a, a);

    assert_eq!(heap.scan_heap(), 0);
  }
}
