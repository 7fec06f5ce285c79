use std::{io, slice};

use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::error::{HeapError, Result};

/// A contiguous span of bytes acquired once and never resized.
pub trait Region {
  /// Acquires `size` bytes whose first byte sits on an `alignment` boundary.
  ///
  /// Called at most once per region.
  fn reserve(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Result<()>;

  /// The reserved bytes, empty before a successful `reserve`.
  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];

  /// Address of the first reserved byte.
  fn base_address(&self) -> usize {
    self.bytes().as_ptr() as usize
  }
}

/// Region carved out of the process data segment by moving the program
/// break with `sbrk(2)`.
///
/// The break is moved exactly once and never moved back; the memory is
/// abandoned at process exit.
#[derive(Debug, Default)]
pub struct SbrkRegion {
  bytes: Option<&'static mut [u8]>,
}

impl SbrkRegion {
  pub fn new() -> Self {
    Self { bytes: None }
  }
}

impl Region for SbrkRegion {
  fn reserve(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Result<()> {
    if self.bytes.is_some() {
      return Err(HeapError::AlreadyReserved);
    }

    check_alignment(alignment)?;

    let total = size
      .checked_add(alignment - 1)
      .filter(|&total| intptr_t::try_from(total).is_ok())
      .ok_or(HeapError::RegionTooLarge {
        requested: size,
        limit: intptr_t::MAX as usize - (alignment - 1),
      })?;

    let address = unsafe { sbrk(total as intptr_t) };

    if address == usize::MAX as *mut c_void {
      return Err(HeapError::RegionRefused {
        size: total,
        source: io::Error::last_os_error(),
      });
    }

    // SAFETY: sbrk handed us `total` fresh bytes that nothing else
    // references, and the break is never lowered again.
    let raw: &'static mut [u8] =
      unsafe { slice::from_raw_parts_mut(address as *mut u8, total) };
    let skip = raw.as_ptr().align_offset(alignment);

    debug!(
      "sbrk reserved {} bytes at {:?}, using {} bytes from offset {}",
      total, address, size, skip
    );

    self.bytes = Some(&mut raw[skip..skip + size]);
    Ok(())
  }

  fn bytes(&self) -> &[u8] {
    self.bytes.as_deref().unwrap_or(&[])
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    self.bytes.as_deref_mut().unwrap_or(&mut [])
  }
}

/// In-memory region backed by a `Vec<u8>`.
///
/// Stands in for the OS region in tests and lets several heaps coexist.
#[derive(Debug, Default)]
pub struct BufferRegion {
  buffer: Vec<u8>,
  start: usize,
  len: usize,
  limit: Option<usize>,
}

impl BufferRegion {
  pub fn new() -> Self {
    Self::default()
  }

  /// A buffer that refuses any reservation larger than `limit` bytes.
  pub fn with_limit(limit: usize) -> Self {
    Self {
      limit: Some(limit),
      ..Self::default()
    }
  }
}

impl Region for BufferRegion {
  fn reserve(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Result<()> {
    if !self.buffer.is_empty() {
      return Err(HeapError::AlreadyReserved);
    }

    check_alignment(alignment)?;

    if let Some(limit) = self.limit.filter(|&limit| size > limit) {
      return Err(HeapError::RegionTooLarge {
        requested: size,
        limit,
      });
    }

    let total = size
      .checked_add(alignment - 1)
      .ok_or(HeapError::RegionTooLarge {
        requested: size,
        limit: usize::MAX - (alignment - 1),
      })?;

    let mut buffer = Vec::new();
    buffer
      .try_reserve_exact(total)
      .map_err(|source| HeapError::BufferRefused {
        size: total,
        source,
      })?;
    buffer.resize(total, 0u8);

    self.buffer = buffer;
    self.start = self.buffer.as_ptr().align_offset(alignment);
    self.len = size;

    debug!(
      "buffer reserved {} bytes, using {} bytes from offset {}",
      self.buffer.len(),
      size,
      self.start
    );

    Ok(())
  }

  fn bytes(&self) -> &[u8] {
    &self.buffer[self.start..self.start + self.len]
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.buffer[self.start..self.start + self.len]
  }
}

fn check_alignment(alignment: usize) -> Result<()> {
  if !alignment.is_power_of_two() {
    return Err(HeapError::InvalidAlignment(alignment));
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_buffer_region_is_aligned() {
    let mut region = BufferRegion::new();

    assert!(region.bytes().is_empty());

    region.reserve(1000, 64).unwrap();

    assert_eq!(region.bytes().len(), 1000);
    assert_eq!(region.base_address() % 64, 0);
  }

  #[test]
  fn test_buffer_region_reserves_once() {
    let mut region = BufferRegion::new();

    region.reserve(128, 8).unwrap();

    assert!(matches!(
      region.reserve(128, 8),
      Err(HeapError::AlreadyReserved)
    ));
  }

  #[test]
  fn test_buffer_region_limit() {
    let mut region = BufferRegion::with_limit(512);

    assert!(matches!(
      region.reserve(1024, 8),
      Err(HeapError::RegionTooLarge {
        requested: 1024,
        limit: 512
      })
    ));
    assert!(region.bytes().is_empty());

    region.reserve(512, 8).unwrap();
    assert_eq!(region.bytes().len(), 512);
  }

  #[test]
  fn test_buffer_region_refuses_huge_size() {
    let mut region = BufferRegion::new();

    assert!(matches!(
      region.reserve(usize::MAX / 2 + 1, 8),
      Err(HeapError::BufferRefused { .. })
    ));
    assert!(matches!(
      region.reserve(usize::MAX, 8),
      Err(HeapError::RegionTooLarge { .. })
    ));
    assert!(region.bytes().is_empty());
  }

  #[test]
  fn test_rejects_zero_alignment() {
    let mut buffer = BufferRegion::new();
    let mut sbrk = SbrkRegion::new();

    assert!(matches!(
      buffer.reserve(64, 0),
      Err(HeapError::InvalidAlignment(0))
    ));
    assert!(matches!(
      sbrk.reserve(64, 0),
      Err(HeapError::InvalidAlignment(0))
    ));
    assert!(matches!(
      buffer.reserve(64, 24),
      Err(HeapError::InvalidAlignment(24))
    ));
    assert!(sbrk.bytes().is_empty());
  }

  #[test]
  fn test_sbrk_region() {
    let mut region = SbrkRegion::new();

    region.reserve(4096, 16).unwrap();

    assert_eq!(region.bytes().len(), 4096);
    assert_eq!(region.base_address() % 16, 0);

    region.bytes_mut().fill(0x5A);
    assert!(region.bytes().iter().all(|&b| b == 0x5A));
  }

  #[test]
  fn test_sbrk_region_too_large() {
    let mut region = SbrkRegion::new();

    assert!(matches!(
      region.reserve(usize::MAX, 8),
      Err(HeapError::RegionTooLarge { .. })
    ));
  }
}
