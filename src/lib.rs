//! # rcollector - A Conservative Mark-and-Sweep Collector
//!
//! This crate pairs a **K&R-style free-list allocator** with a
//! **Boehm-style conservative garbage collector**. Memory is handed out with
//! [`Gc::allocate`] and is never freed by hand: a call to [`Gc::collect`]
//! finds every block that can no longer be reached and returns it to the
//! free list.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           RESERVED REGION                            │
//!   │                                                                      │
//!   │   ┌───┬────────┬──────┬─────────────┬──────┬───────────────────────┐ │
//!   │   │ S │  free  │  A   │    free     │  B   │     not handed out    │ │
//!   │   └───┴────────┴──────┴─────────────┴──────┴───────────────────────┘ │
//!   │     ▲                                      ▲                       ▲ │
//!   │     │                                      │                       │ │
//!   │  Sentinel                               Break                Reserved│
//!   │  (granule 0)                            (sbrk)                 end   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   free list:  S ──▶ free ──▶ free ──▶ S      ascending addresses
//!   used list:  A ──▶ B ──▶ A                  any order
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rcollector
//!   ├── align      - Power-of-two rounding (align!)
//!   ├── block      - Block header and granule arithmetic (internal)
//!   ├── region     - Reserved address space with an emulated program break
//!   ├── heap       - Heap state, statistics and block info
//!   ├── free_list  - Next-fit allocation, coalescing release, growth
//!   ├── used_list  - Live-block registry and mark flags
//!   ├── scan       - Root and heap scanning
//!   ├── sweep      - Reclaiming unmarked blocks
//!   ├── roots      - RootSource, ExplicitRoots, NativeRoots
//!   ├── config     - HeapCreateInfo, Propagation
//!   └── collector  - Gc, the public entry point
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rcollector::{ExplicitRoots, Gc, HeapCreateInfo};
//!
//! fn main() {
//!     let mut gc = Gc::new(HeapCreateInfo::default(), ExplicitRoots::new()).unwrap();
//!     gc.init();
//!
//!     let kept = gc.allocate(64).unwrap();
//!     let lost = gc.allocate(64).unwrap();
//!
//!     // Only `kept` is reachable from a root
//!     gc.roots_mut().push(kept.as_ptr() as usize);
//!
//!     let collection = gc.collect();
//!     assert_eq!(collection.reclaimed, 1);
//!     assert!(gc.is_allocated(kept.as_ptr()));
//!     assert!(!gc.is_allocated(lost.as_ptr()));
//! }
//! ```
//!
//! ## How It Works
//!
//! Every block starts with a one-granule header:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │          Payload               │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N units   │  │  ┌──────────────────────────┐  │
//!   │  │ flags: marked?  │  │  │                          │  │
//!   │  │ next: block     │  │  │  (N - 1) * GRANULE bytes │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │     GRANULE bytes     │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! A collection runs in three steps:
//!
//! 1. **Roots**: every word of the static roots and of the live stack is
//!    treated as a possible address. Each block whose payload contains
//!    one is marked.
//! 2. **Heap**: the payloads of marked blocks are scanned the same way,
//!    either once ([`Propagation::SinglePass`]) or until nothing new is
//!    found ([`Propagation::FixedPoint`]).
//! 3. **Sweep**: unmarked blocks go back to the free list and merge with
//!    their free neighbours. Marks are cleared on the rest.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Gc` is neither `Send` nor `Sync`
//! - **Conservative**: an integer that looks like an address keeps a block alive
//! - **No compaction**: blocks never move
//! - **Explicit collection**: nothing triggers `collect` automatically
//! - **Unix-only**: requires `libc` and `mmap`; [`NativeRoots`] requires Linux/glibc
//!
//! ## Safety
//!
//! Payloads are handed out as raw pointers. Anything the program wants
//! kept alive must stay visible to the [`RootSource`], either directly or
//! through other reachable payloads.

pub mod align;
mod block;
mod collector;
mod config;
mod error;
mod free_list;
mod heap;
mod region;
mod roots;
mod scan;
mod sweep;
mod used_list;

pub use block::GRANULE;
pub use collector::{Collection, Gc};
pub use config::{HeapCreateInfo, Propagation};
pub use error::{GcError, RootError};
pub use heap::{BlockInfo, HeapStats};
pub use region::page_size;
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub use roots::NativeRoots;
pub use roots::{ExplicitRoots, RootSource};
pub use scan::Scanner;
