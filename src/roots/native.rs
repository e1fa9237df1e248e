use std::{fs, hint, mem::MaybeUninit, ptr};

use libc::c_void;

use super::RootSource;
use crate::{error::RootError, scan::Scanner};

const PROC_STAT: &str = "/proc/self/stat";

// Provided by the linker: start of `.data` and end of `.bss`.
unsafe extern "C" {
  static __data_start: u8;
  static _end: u8;
}

/// Boehm-style roots: the process data segment and the calling thread's
/// stack, from its current top down to the origin found by `init`.
///
/// Values held only in registers are not seen. Whatever the compiler
/// spilled to the stack is.
#[derive(Debug, Default)]
pub struct NativeRoots {
  stack_origin: usize,
}

impl NativeRoots {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn stack_origin(&self) -> usize {
    self.stack_origin
  }
}

impl RootSource for NativeRoots {
  fn init(&mut self) -> Result<(), RootError> {
    self.stack_origin = if is_main_thread() {
      let stat = fs::read_to_string(PROC_STAT).map_err(|source| RootError::Io {
        path: PROC_STAT,
        source,
      })?;
      parse_start_stack(&stat).ok_or(RootError::MalformedStat(PROC_STAT))?
    } else {
      thread_stack_top()?
    };

    log::debug!("[gc] native stack origin at {:#x}", self.stack_origin);
    Ok(())
  }

  fn scan_statics(
    &self,
    scanner: &mut Scanner<'_>,
  ) {
    // SAFETY: `.data` and `.bss` are mapped for the whole life of the process.
    unsafe {
      let start = &raw const __data_start;
      let end = &raw const _end;
      scanner.scan_raw(start.cast(), end.cast());
    }
  }

  #[inline(never)]
  fn scan_stack(
    &self,
    scanner: &mut Scanner<'_>,
  ) {
    let top = 0usize;
    let top = hint::black_box(&raw const top);
    // SAFETY: everything between a live local and the origin of this
    // thread's stack is mapped.
    unsafe { scanner.scan_raw(top.cast(), self.stack_origin as *const usize) };
  }
}

/// Extracts field 28 (`startstack`) from the contents of `/proc/<pid>/stat`.
/// The command name in field 2 may contain spaces and parentheses, so
/// counting starts after its closing parenthesis.
pub(crate) fn parse_start_stack(stat: &str) -> Option<usize> {
  let (_, rest) = stat.rsplit_once(')')?;
  // `rest` begins with field 3
  rest.split_whitespace().nth(28 - 3)?.parse().ok()
}

fn is_main_thread() -> bool {
  // SAFETY: neither call has preconditions.
  unsafe { libc::syscall(libc::SYS_gettid) as libc::pid_t == libc::getpid() }
}

fn thread_stack_top() -> Result<usize, RootError> {
  let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();
  let mut addr: *mut c_void = ptr::null_mut();
  let mut size: libc::size_t = 0;

  // SAFETY: `attr` is initialised by pthread_getattr_np before it is read
  // and destroyed exactly once afterwards.
  unsafe {
    let code = libc::pthread_getattr_np(libc::pthread_self(), attr.as_mut_ptr());
    if code != 0 {
      return Err(RootError::ThreadAttr(code));
    }
    let code = libc::pthread_attr_getstack(attr.as_ptr(), &mut addr, &mut size);
    libc::pthread_attr_destroy(attr.as_mut_ptr());
    if code != 0 {
      return Err(RootError::ThreadAttr(code));
    }
  }

  Ok(addr as usize + size)
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::{Gc, HeapCreateInfo};

  static KEEP: AtomicUsize = AtomicUsize::new(0);

  #[test]
  fn test_parse_start_stack_skips_odd_command_names() {
    let stat = "4242 (my (odd) prog) S 1 4242 4242 0 -1 4194560 101 0 0 0 0 0 0 0 20 0 1 0 \
                12345 1000 50 18446744073709551615 1 1 140736494577504 0 0 0 0 0 0 0 0 0 17 3 0 0";

    assert_eq!(parse_start_stack(stat), Some(140736494577504));
  }

  #[test]
  fn test_parse_start_stack_rejects_truncated_input() {
    assert_eq!(parse_start_stack("1 (sh) S 0 1"), None);
    assert_eq!(parse_start_stack("garbage"), None);
  }

  #[test]
  fn test_origin_is_above_current_frame() {
    let mut roots = NativeRoots::new();
    roots.init().unwrap();

    let local = 0u8;
    assert!(roots.stack_origin() > (&raw const local) as usize);
  }

  #[test]
  fn test_static_root_keeps_block_alive() {
    let mut gc = Gc::new(HeapCreateInfo::default(), NativeRoots::new()).unwrap();
    gc.try_init().unwrap();

    let kept = gc.allocate(64).unwrap();
    KEEP.store(kept.as_ptr() as usize, Ordering::SeqCst);

    gc.collect();

    assert!(gc.is_allocated(kept.as_ptr()));
    KEEP.store(0, Ordering::SeqCst);
  }

  #[test]
  fn test_stack_root_keeps_block_alive() {
    let mut gc = Gc::new(HeapCreateInfo::default(), NativeRoots::new()).unwrap();
    gc.try_init().unwrap();

    let kept = gc.allocate(64).unwrap();
    let slot = hint::black_box(kept.as_ptr() as usize);
    let slot = hint::black_box(&slot);

    gc.collect();

    assert!(gc.is_allocated(*slot as *const u8));
  }
}
