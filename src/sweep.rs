use crate::{block::GRANULE, heap::Heap};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Swept {
  pub retained: usize,
  pub reclaimed: usize,
  pub reclaimed_bytes: usize,
}

impl Heap {
  /// Returns every unmarked used block to the free list and clears the mark
  /// on the rest.
  ///
  /// Traversal starts after the head and ends with the head itself, so
  /// `prev` always holds the last retained block (or the head) whose link
  /// must skip a removed node.
  pub(crate) fn sweep(&mut self) -> Swept {
    let mut swept = Swept::default();
    let Some(head) = self.usedp else {
      return swept;
    };

    let mut prev = head;
    let mut p = self.next(head);

    loop {
      if self.is_marked(p) {
        self.unmark(p);
        swept.retained += 1;

        if p == head {
          break;
        }
        prev = p;
        p = self.next(p);
        continue;
      }

      let succ = self.next(p);
      let was_head = p == head;
      swept.reclaimed += 1;
      swept.reclaimed_bytes += (self.size(p) - 1) * GRANULE;

      if succ == p {
        self.usedp = None;
        self.release(p);
        break;
      }

      self.set_next(prev, succ);
      self.release(p);

      if was_head {
        self.usedp = Some(prev);
        break;
      }
      p = succ;
    }

    swept
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{block::Block, config::HeapCreateInfo};

  fn heap() -> Heap {
    let mut heap = Heap::new(&HeapCreateInfo::default()).unwrap();
    heap.reset().unwrap();
    heap
  }

  fn allocate(
    heap: &mut Heap,
    count: usize,
  ) -> Vec<Block> {
    (0..count).map(|_| heap.allocate(32).unwrap()).collect()
  }

  #[test]
  fn test_sweep_with_nothing_marked_empties_the_list() {
    let mut heap = heap();
    allocate(&mut heap, 5);

    let swept = heap.sweep();

    assert_eq!(swept.reclaimed, 5);
    assert_eq!(swept.retained, 0);
    assert_eq!(heap.usedp, None);
    assert_eq!(heap.free().count(), 1);
  }

  #[test]
  fn test_sweep_keeps_marked_and_clears_marks() {
    let mut heap = heap();
    let blocks = allocate(&mut heap, 5);
    heap.mark(blocks[1]);
    heap.mark(blocks[3]);

    let swept = heap.sweep();

    assert_eq!(swept.retained, 2);
    assert_eq!(swept.reclaimed, 3);
    let mut left: Vec<Block> = heap.used().collect();
    left.sort();
    let mut expected = vec![blocks[1], blocks[3]];
    expected.sort();
    assert_eq!(left, expected);
    assert!(left.iter().all(|&b| !heap.is_marked(b)));
  }

  #[test]
  fn test_sweep_moves_head_when_head_is_garbage() {
    let mut heap = heap();
    let blocks = allocate(&mut heap, 3);
    assert_eq!(heap.usedp, Some(blocks[0]));
    heap.mark(blocks[2]);

    heap.sweep();

    assert_eq!(heap.usedp, Some(blocks[2]));
    assert_eq!(heap.used().collect::<Vec<_>>(), vec![blocks[2]]);
    assert_eq!(heap.next(blocks[2]), blocks[2]);
  }

  #[test]
  fn test_sweep_keeps_lone_marked_block() {
    let mut heap = heap();
    let blocks = allocate(&mut heap, 1);
    heap.mark(blocks[0]);

    let swept = heap.sweep();

    assert_eq!(swept.retained, 1);
    assert_eq!(heap.usedp, Some(blocks[0]));
    assert!(!heap.is_marked(blocks[0]));
  }
}
