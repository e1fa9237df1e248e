//! Where marking starts.
//!
//! A [`RootSource`] hands the collector two groups of candidate words: the
//! static data, then the live part of the stack. [`ExplicitRoots`] keeps both
//! in ordinary vectors that the program fills in itself. [`NativeRoots`]
//! reads them straight out of the process image and the thread's stack.

#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod native;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub use native::NativeRoots;

use crate::{error::RootError, scan::Scanner};

pub trait RootSource {
  /// Runs once, from the first `Gc::init`. Finds whatever boundaries the
  /// source needs later.
  fn init(&mut self) -> Result<(), RootError> {
    Ok(())
  }

  fn scan_statics(
    &self,
    scanner: &mut Scanner<'_>,
  );

  fn scan_stack(
    &self,
    scanner: &mut Scanner<'_>,
  );
}

/// Roots registered by hand: a table of static slots and a shadow stack.
///
/// ```text
///   statics  [ g0 | g1 | g2 ]         always scanned
///
///   stack    [ s0 | s1 | s2 | s3 ]    scanned from the top down to the
///                             ▲       origin recorded by `init`
///                            top
/// ```
#[derive(Debug, Default)]
pub struct ExplicitRoots {
  statics: Vec<usize>,
  stack: Vec<usize>,
  origin: usize,
}

impl ExplicitRoots {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a static slot holding `value` and returns its index.
  pub fn add_static(
    &mut self,
    value: usize,
  ) -> usize {
    self.statics.push(value);
    self.statics.len() - 1
  }

  pub fn set_static(
    &mut self,
    slot: usize,
    value: usize,
  ) {
    self.statics[slot] = value;
  }

  pub fn push(
    &mut self,
    value: usize,
  ) {
    self.stack.push(value);
  }

  pub fn pop(&mut self) -> Option<usize> {
    self.stack.pop()
  }

  pub fn depth(&self) -> usize {
    self.stack.len()
  }

  /// Drops everything above `depth`, the way returning from a frame does.
  pub fn truncate(
    &mut self,
    depth: usize,
  ) {
    self.stack.truncate(depth);
  }

  pub fn origin(&self) -> usize {
    self.origin
  }
}

impl RootSource for ExplicitRoots {
  fn init(&mut self) -> Result<(), RootError> {
    self.origin = self.stack.len();
    log::debug!("[gc] shadow stack origin at depth {}", self.origin);
    Ok(())
  }

  fn scan_statics(
    &self,
    scanner: &mut Scanner<'_>,
  ) {
    scanner.scan_region(self.statics.iter().copied());
  }

  fn scan_stack(
    &self,
    scanner: &mut Scanner<'_>,
  ) {
    let live = self.stack.get(self.origin..).unwrap_or_default();
    scanner.scan_region(live.iter().rev().copied());
  }
}
