use crate::{block::Block, heap::Heap};

/// Walks the used list from its head, visiting every block once.
pub struct UsedBlocks<'a> {
  heap: &'a Heap,
  head: Option<Block>,
  cursor: Option<Block>,
}

impl Iterator for UsedBlocks<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    let current = self.cursor?;
    let next = self.heap.next(current);
    self.cursor = (Some(next) != self.head).then_some(next);
    Some(current)
  }
}

impl Heap {
  /// Splices a freshly allocated block in right after the head.
  pub(crate) fn track(
    &mut self,
    block: Block,
  ) {
    match self.usedp {
      None => {
        self.set_next(block, block);
        self.usedp = Some(block);
      }
      Some(head) => {
        let next = self.next(head);
        self.set_next(block, next);
        self.set_next(head, block);
      }
    }
  }

  pub fn used(&self) -> UsedBlocks<'_> {
    UsedBlocks {
      heap: self,
      head: self.usedp,
      cursor: self.usedp,
    }
  }

  pub(crate) fn is_marked(
    &self,
    block: Block,
  ) -> bool {
    self.region.header(block).is_marked()
  }

  pub(crate) fn mark(
    &mut self,
    block: Block,
  ) {
    self.set_marked(block, true);
  }

  pub(crate) fn unmark(
    &mut self,
    block: Block,
  ) {
    self.set_marked(block, false);
  }

  fn set_marked(
    &mut self,
    block: Block,
    marked: bool,
  ) {
    let mut header = self.region.header(block);
    header.set_marked(marked);
    self.region.set_header(block, header);
  }

  /// First used block, in list order, whose payload holds `addr`.
  pub(crate) fn block_containing(
    &self,
    addr: usize,
    exclude: Option<Block>,
  ) -> Option<Block> {
    if !self.region.span().contains(&addr) {
      return None;
    }

    self
      .used()
      .filter(|&b| Some(b) != exclude)
      .find(|&b| self.payload_contains(b, addr))
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    block::{Block, GRANULE},
    config::HeapCreateInfo,
    heap::Heap,
  };

  fn heap() -> Heap {
    let mut heap = Heap::new(&HeapCreateInfo::default()).unwrap();
    heap.reset().unwrap();
    heap
  }

  #[test]
  fn test_new_blocks_follow_the_head() {
    let mut heap = heap();

    let first = heap.allocate(8).unwrap();
    let second = heap.allocate(8).unwrap();
    let third = heap.allocate(8).unwrap();

    assert_eq!(heap.used().collect::<Vec<_>>(), vec![first, third, second]);
    assert_eq!(heap.usedp, Some(first));
  }

  #[test]
  fn test_single_block_links_to_itself() {
    let mut heap = heap();

    let only = heap.allocate(8).unwrap();

    assert_eq!(heap.next(only), only);
    assert_eq!(heap.used().count(), 1);
  }

  #[test]
  fn test_mark_does_not_disturb_traversal() {
    let mut heap = heap();

    let blocks: Vec<Block> = (0..4).map(|_| heap.allocate(8).unwrap()).collect();
    let before: Vec<Block> = heap.used().collect();

    for &block in &blocks {
      heap.mark(block);
    }
    assert!(blocks.iter().all(|&b| heap.is_marked(b)));
    assert_eq!(heap.used().collect::<Vec<_>>(), before);

    heap.unmark(blocks[2]);
    assert!(!heap.is_marked(blocks[2]));
    assert!(heap.is_marked(blocks[1]));
  }

  #[test]
  fn test_block_containing_accepts_interior_addresses_only() {
    let mut heap = heap();

    let block = heap.allocate(3 * GRANULE).unwrap();
    let start = heap.payload(block).as_ptr() as usize;

    assert_eq!(heap.block_containing(start, None), Some(block));
    assert_eq!(heap.block_containing(start + 2 * GRANULE + 7, None), Some(block));
    assert_eq!(heap.block_containing(start - GRANULE, None), None);
    assert_eq!(heap.block_containing(start + 3 * GRANULE, None), None);
    assert_eq!(heap.block_containing(start, Some(block)), None);
    assert_eq!(heap.block_containing(0, None), None);
  }
}
