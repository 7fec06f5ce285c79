use std::{collections::TryReserveError, io};

use thiserror::Error;

/// Errors raised while configuring a heap or acquiring its region.
///
/// Running out of space is not an error: [`Heap::allocate`](crate::Heap::allocate)
/// reports it by returning `None`.
#[derive(Debug, Error)]
pub enum HeapError {
  /// The OS refused to move the program break.
  #[error("region of {size} bytes refused by the OS: {source}")]
  RegionRefused {
    size: usize,
    #[source]
    source: io::Error,
  },
  /// The process allocator could not back an in-memory region.
  #[error("in-memory region of {size} bytes unavailable: {source}")]
  BufferRefused {
    size: usize,
    #[source]
    source: TryReserveError,
  },
  /// The region source cannot provide that many bytes.
  #[error("region of {requested} bytes exceeds the {limit} bytes available")]
  RegionTooLarge { requested: usize, limit: usize },
  /// Alignment boundaries must be non-zero powers of two.
  #[error("alignment {0} is not a power of two")]
  InvalidAlignment(usize),
  /// The aligned region cannot hold a single descriptor plus payload.
  #[error("region of {size} bytes cannot hold a {descriptor} byte descriptor")]
  RegionTooSmall { size: usize, descriptor: usize },
  /// An earlier reservation failed; the heap stays unusable.
  #[error("region unavailable after a failed reservation")]
  RegionUnavailable,
  /// A configuration variable could not be parsed.
  #[error("invalid value {value:?} for {var}")]
  InvalidEnv { var: &'static str, value: String },
  /// `reserve` was called on a region that already holds memory.
  #[error("region already reserved")]
  AlreadyReserved,
}

pub type Result<T> = std::result::Result<T, HeapError>;
