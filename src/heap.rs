use std::{fmt, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  block::Block,
  config::HeapConfig,
  error::{HeapError, Result},
  region::{Region, SbrkRegion},
};

/// Handle to an allocated payload: the offset of its first byte inside the
/// region.
///
/// The caller owns the payload bytes until the handle is passed back to
/// [`Heap::release`]; the descriptor in front of them stays with the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Payload(usize);

impl Payload {
  pub fn offset(&self) -> usize {
    self.0
  }
}

/// One row of [`Heap::dump_free_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the descriptor inside the region.
  pub offset: usize,
  pub size: usize,
  pub prev: Option<usize>,
  pub next: Option<usize>,
  pub occupied: bool,
}

impl fmt::Display for BlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "Freelist Size:{}, Head:{:#x}, Prev:{}, Next:{}, Occupied:{}",
      self.size,
      self.offset,
      Link(self.prev),
      Link(self.next),
      self.occupied
    )
  }
}

struct Link(Option<usize>);

impl fmt::Display for Link {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.0 {
      Some(offset) => write!(f, "{offset:#x}"),
      None => f.write_str("null"),
    }
  }
}

/// Summary of one walk over the block list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub region_size: usize,
  pub blocks: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Unreserved,
  Ready { head: usize },
  Unusable,
}

/// First-fit allocator over a single fixed-size region.
///
/// Every block, free or occupied, is a member of one doubly linked list kept
/// in address order. Allocation walks the whole list; release only touches
/// the released block's neighbours.
pub struct Heap<R: Region = SbrkRegion> {
  config: HeapConfig,
  region: R,
  state: State,
}

impl Heap<SbrkRegion> {
  /// A heap whose region is taken from the program break on first use.
  pub fn new(config: HeapConfig) -> Self {
    Self::with_region(config, SbrkRegion::new())
  }
}

impl Default for Heap<SbrkRegion> {
  fn default() -> Self {
    Self::new(HeapConfig::default())
  }
}

impl<R: Region> Heap<R> {
  pub fn with_region(
    config: HeapConfig,
    region: R,
  ) -> Self {
    Self {
      config,
      region,
      state: State::Unreserved,
    }
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  pub fn is_initialized(&self) -> bool {
    matches!(self.state, State::Ready { .. })
  }

  /// Reserves the region and installs a single free block spanning it.
  ///
  /// Returns `false` if the region could not be acquired. That failure is
  /// permanent: the region source is never asked again.
  pub fn init(&mut self) -> bool {
    self.try_init().is_ok()
  }

  /// Like [`Heap::init`], but reports why the region is unavailable.
  pub fn try_init(&mut self) -> Result<()> {
    match self.state {
      State::Ready { .. } => return Ok(()),
      State::Unusable => return Err(HeapError::RegionUnavailable),
      State::Unreserved => {}
    }

    let size = self.config.region_size();
    let descriptor = self.config.descriptor_size();

    if let Err(err) = self.region.reserve(size, self.config.alignment()) {
      warn!("region of {} bytes unavailable: {}", size, err);
      self.state = State::Unusable;
      return Err(err);
    }

    Block::new(size - descriptor, false, None, None).write(self.region.bytes_mut(), 0);
    self.state = State::Ready { head: 0 };

    debug!(
      "heap ready: {} bytes at {:#x}, descriptor {} bytes, alignment {}",
      size,
      self.region.base_address(),
      descriptor,
      self.config.alignment()
    );

    Ok(())
  }

  /// Allocates at least `size` bytes, first fit in address order.
  ///
  /// Returns `None` when no free block is large enough, whether the region
  /// is full or merely fragmented, or when the region cannot be acquired.
  ///
  /// # Panics
  ///
  /// Panics if `size` is zero.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<Payload> {
    assert!(size > 0, "allocation size must be positive");

    let head = match self.state {
      State::Ready { head } => head,
      State::Unusable => return None,
      State::Unreserved => {
        self.try_init().ok()?;
        0
      }
    };

    if size > self.config.region_size() {
      return None;
    }

    let needed = self.config.align(size);
    let descriptor = self.config.descriptor_size();

    let offset = self.find_free_block(head, needed)?;
    let mut block = Block::read(self.region.bytes(), offset);

    if block.size > needed + descriptor {
      self.split(offset, &mut block, needed);
    }

    block.occupied = true;
    block.write(self.region.bytes_mut(), offset);

    trace!("allocated {} bytes ({} requested) at {:#x}", block.size, size, offset);

    Some(Payload(offset + descriptor))
  }

  /// Returns a payload to the heap, merging it with free neighbours.
  ///
  /// `payload` must come from [`Heap::allocate`] on this heap and must not
  /// have been released already. Other handles are not detected and leave
  /// the block list in an unspecified state.
  pub fn release(
    &mut self,
    payload: Payload,
  ) {
    let offset = payload.0 - self.config.descriptor_size();
    let bytes = self.region.bytes_mut();

    let mut block = Block::read(bytes, offset);
    block.occupied = false;
    block.write(bytes, offset);

    trace!("released {} bytes at {:#x}", block.size, offset);

    let block = self.coalesce_forward(offset);

    if let Some(prev) = block.prev {
      if !Block::read(self.region.bytes(), prev).occupied {
        self.coalesce_forward(prev);
      }
    }
  }

  /// The payload bytes leased through `payload`.
  pub fn payload(
    &self,
    payload: Payload,
  ) -> &[u8] {
    let block = self.block_of(payload);
    &self.region.bytes()[payload.0..payload.0 + block.size]
  }

  pub fn payload_mut(
    &mut self,
    payload: Payload,
  ) -> &mut [u8] {
    let block = self.block_of(payload);
    &mut self.region.bytes_mut()[payload.0..payload.0 + block.size]
  }

  /// Raw address of the first payload byte.
  pub fn as_mut_ptr(
    &mut self,
    payload: Payload,
  ) -> NonNull<u8> {
    NonNull::from(self.payload_mut(payload)).cast()
  }

  /// Every block in address order, free and occupied alike.
  pub fn dump_free_list(&self) -> Vec<BlockInfo> {
    let State::Ready { head } = self.state else {
      return Vec::new();
    };

    let bytes = self.region.bytes();
    let mut blocks = Vec::new();
    let mut current = Some(head);

    while let Some(offset) = current {
      let block = Block::read(bytes, offset);

      blocks.push(BlockInfo {
        offset,
        size: block.size,
        prev: block.prev,
        next: block.next,
        occupied: block.occupied,
      });

      current = block.next;
    }

    blocks
  }

  /// Logs [`Heap::dump_free_list`] at debug level.
  pub fn print_free_list(&self) {
    for block in self.dump_free_list() {
      debug!("\t{block}\t");
    }
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      region_size: self.region.bytes().len(),
      ..HeapStats::default()
    };

    for block in self.dump_free_list() {
      stats.blocks += 1;

      if !block.occupied {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
        stats.largest_free = stats.largest_free.max(block.size);
      }
    }

    stats
  }

  fn block_of(
    &self,
    payload: Payload,
  ) -> Block {
    Block::read(self.region.bytes(), payload.0 - self.config.descriptor_size())
  }

  fn find_free_block(
    &self,
    head: usize,
    size: usize,
  ) -> Option<usize> {
    let bytes = self.region.bytes();
    let mut current = Some(head);

    while let Some(offset) = current {
      let block = Block::read(bytes, offset);

      if !block.occupied && block.size >= size {
        return Some(offset);
      }

      current = block.next;
    }

    None
  }

  /// Carves a free remainder off `block` right after its first `size`
  /// payload bytes. `block` is updated but not written back.
  fn split(
    &mut self,
    offset: usize,
    block: &mut Block,
    size: usize,
  ) {
    let total = size + self.config.descriptor_size();
    let rest_offset = offset + total;
    let bytes = self.region.bytes_mut();

    Block::new(block.size - total, false, block.next, Some(offset)).write(bytes, rest_offset);

    if let Some(next) = block.next {
      set_prev(bytes, next, Some(rest_offset));
    }

    trace!("split {:#x}: {} + {} bytes", offset, size, block.size - total);

    block.size = size;
    block.next = Some(rest_offset);

    self.coalesce_forward(rest_offset);
  }

  /// Absorbs the block following `offset` if it is free, returning the
  /// resulting descriptor.
  fn coalesce_forward(
    &mut self,
    offset: usize,
  ) -> Block {
    let descriptor = self.config.descriptor_size();
    let bytes = self.region.bytes_mut();
    let mut block = Block::read(bytes, offset);

    let Some(next_offset) = block.next else {
      return block;
    };

    let next = Block::read(bytes, next_offset);

    if next.occupied {
      return block;
    }

    block.size += next.size + descriptor;
    block.next = next.next;
    block.write(bytes, offset);

    if let Some(after) = next.next {
      set_prev(bytes, after, Some(offset));
    }

    trace!("coalesced {:#x} into {:#x}: {} bytes", next_offset, offset, block.size);

    block
  }
}

fn set_prev(
  region: &mut [u8],
  offset: usize,
  prev: Option<usize>,
) {
  let mut block = Block::read(region, offset);
  block.prev = prev;
  block.write(region, offset);
}
