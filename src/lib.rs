//! # firstfit - A First-Fit Heap Over One Fixed Region
//!
//! This crate provides a **first-fit allocator** that reserves a single,
//! fixed-size region once and serves variable-size allocations out of it,
//! splitting blocks on the way out and coalescing them on the way back.
//! The region is never grown and never returned to the OS.
//!
//! ## Overview
//!
//! Every block in the region, free or occupied, starts with a descriptor and
//! belongs to one doubly linked list kept in address order:
//!
//! ```text
//!   Region Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                            REGION                                    │
//!   │                                                                      │
//!   │   ┌────┬────────┬────┬──────┬────┬───────────────────────────────┐   │
//!   │   │ D  │  A1    │ D  │ free │ D  │            free               │   │
//!   │   └────┴────────┴────┴──────┴────┴───────────────────────────────┘   │
//!   │     │  ▲          │  ▲        │                                      │
//!   │     │  └ payload  │  │        │                                      │
//!   │     └──── next ──►┘  └◄─ prev ┘                                      │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation walks every block:       O(blocks)
//!   Release only looks at neighbours:   O(1)
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   firstfit
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Block descriptor encoding (internal)
//!   ├── config     - HeapConfig: region size and alignment
//!   ├── error      - HeapError
//!   ├── heap       - Heap: init, allocate, release, diagnostics
//!   └── region     - Region sources (sbrk, in-memory buffer)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use firstfit::{BufferRegion, Heap, HeapConfig};
//!
//! let config = HeapConfig::new(1024, 8).unwrap();
//! let mut heap = Heap::with_region(config, BufferRegion::new());
//!
//! // The region is reserved on the first allocation.
//! let payload = heap.allocate(100).unwrap();
//! heap.payload_mut(payload)[..5].copy_from_slice(b"hello");
//!
//! heap.release(payload);
//! assert_eq!(heap.dump_free_list().len(), 1);
//! ```
//!
//! ## How It Works
//!
//! Allocation rounds the request up to the alignment boundary and takes the
//! first free block large enough. If that block has room for another
//! descriptor plus payload, the tail is split off as a new free block:
//!
//! ```text
//!   Split (allocate 100, alignment 8, descriptor 32):
//!
//!   Before:  ┌────┬──────────────────────── 992 ───────────────────────┐
//!            │ D  │                        free                        │
//!            └────┴────────────────────────────────────────────────────┘
//!
//!   After:   ┌────┬─── 104 ───┬────┬──────────────── 856 ─────────────┐
//!            │ D  │  occupied │ D  │               free               │
//!            └────┴───────────┴────┴──────────────────────────────────┘
//! ```
//!
//! Releasing a block marks it free, then merges it with a free successor and
//! lets a free predecessor absorb it, so no two adjacent blocks are ever
//! both free:
//!
//! ```text
//!   Coalesce (release B):
//!
//!   ┌────┬ A free ┬────┬ B ┬────┬ C free ┐        ┌────┬──── A + B + C + 2D ────┐
//!   │ D  │        │ D  │   │ D  │        │  ───►  │ D  │          free           │
//!   └────┴────────┴────┴───┴────┴────────┘        └────┴─────────────────────────┘
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap a [`Heap`] in a mutex to share it
//! - **Fixed size**: the region is reserved once and never grows
//! - **First fit only**: no size classes, no compaction
//! - **No validation**: releasing a foreign or stale [`Payload`] is not detected

pub mod align;
mod block;
mod config;
mod error;
mod heap;
mod region;

pub use config::{ALIGNMENT, HeapConfig, MAX_HEAP_SIZE};
pub use error::{HeapError, Result};
pub use heap::{BlockInfo, Heap, HeapStats, Payload};
pub use region::{BufferRegion, Region, SbrkRegion};
