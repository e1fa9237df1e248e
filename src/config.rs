use crate::region::page_size;

/// How far reachability is propagated through the heap after the roots are
/// scanned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Propagation {
  /// One forward pass over the used list. A block marked after the pass
  /// has already visited it is not scanned, so long chains may be cut.
  SinglePass,
  /// Repeat the pass until no new block gets marked.
  #[default]
  FixedPoint,
}

#[derive(Clone, Debug)]
pub struct HeapCreateInfo {
  /// Address space reserved up front. Growth past it is reported as out of
  /// memory. Rounded up to whole pages.
  pub reserve: usize,
  /// Smallest amount of memory requested per growth step.
  pub chunk: usize,
  pub propagation: Propagation,
}

impl Default for HeapCreateInfo {
  fn default() -> Self {
    Self {
      reserve: 64 * 1024 * 1024,
      chunk: page_size(),
      propagation: Propagation::default(),
    }
  }
}
