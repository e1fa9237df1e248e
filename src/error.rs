use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GcError {
  #[error("out of memory: cannot satisfy a request of {requested} bytes")]
  OutOfMemory { requested: usize },

  #[error("zero-sized allocation requested")]
  ZeroSized,

  #[error("collector used before `init`")]
  NotInitialized,

  #[error("failed to reserve {bytes} bytes of address space")]
  Reserve {
    bytes: usize,
    #[source]
    source: io::Error,
  },

  #[error("reservation of {bytes} bytes exceeds what a block header can describe")]
  ReservationTooLarge { bytes: usize },

  #[error("root discovery failed")]
  Roots(#[from] RootError),
}

#[derive(Debug, Error)]
pub enum RootError {
  #[error("cannot read {path}")]
  Io {
    path: &'static str,
    #[source]
    source: io::Error,
  },

  #[error("no stack start field in {0}")]
  MalformedStat(&'static str),

  #[error("pthread_getattr_np failed with code {0}")]
  ThreadAttr(i32),
}
