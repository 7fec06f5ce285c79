use std::{env, mem};

use crate::{
  align_to,
  block::DESCRIPTOR_WORDS,
  error::{HeapError, Result},
};

/// Default total region size, before alignment.
pub const MAX_HEAP_SIZE: usize = 1024;

/// Default alignment boundary: one machine word.
pub const ALIGNMENT: usize = mem::size_of::<usize>();

const MAX_HEAP_SIZE_VAR: &str = "FIRSTFIT_MAX_HEAP_SIZE";
const ALIGNMENT_VAR: &str = "FIRSTFIT_ALIGNMENT";

/// Size and alignment parameters of a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  max_heap_size: usize,
  alignment: usize,
}

impl HeapConfig {
  pub fn new(
    max_heap_size: usize,
    alignment: usize,
  ) -> Result<Self> {
    if alignment == 0 || !alignment.is_power_of_two() {
      return Err(HeapError::InvalidAlignment(alignment));
    }

    let config = Self {
      max_heap_size,
      alignment,
    };

    let size = match max_heap_size.checked_add(alignment - 1) {
      Some(_) => config.region_size(),
      None => 0,
    };

    if size <= config.descriptor_size() {
      return Err(HeapError::RegionTooSmall {
        size,
        descriptor: config.descriptor_size(),
      });
    }

    Ok(config)
  }

  /// Builds a configuration from `FIRSTFIT_MAX_HEAP_SIZE` and
  /// `FIRSTFIT_ALIGNMENT`, using the defaults for unset variables.
  pub fn from_env() -> Result<Self> {
    let max_heap_size = read_var(MAX_HEAP_SIZE_VAR)?.unwrap_or(MAX_HEAP_SIZE);
    let alignment = read_var(ALIGNMENT_VAR)?.unwrap_or(ALIGNMENT);

    Self::new(max_heap_size, alignment)
  }

  pub fn max_heap_size(&self) -> usize {
    self.max_heap_size
  }

  pub fn alignment(&self) -> usize {
    self.alignment
  }

  /// Rounds `size` up to the alignment boundary.
  pub fn align(
    &self,
    size: usize,
  ) -> usize {
    align_to!(size, self.alignment)
  }

  /// Bytes reserved from the region source.
  pub fn region_size(&self) -> usize {
    self.align(self.max_heap_size)
  }

  /// Per-block overhead: the descriptor's natural size, aligned.
  pub fn descriptor_size(&self) -> usize {
    self.align(DESCRIPTOR_WORDS * mem::size_of::<usize>())
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      max_heap_size: MAX_HEAP_SIZE,
      alignment: ALIGNMENT,
    }
  }
}

fn read_var(var: &'static str) -> Result<Option<usize>> {
  match env::var(var) {
    Ok(value) => parse_size(var, value).map(Some),
    Err(env::VarError::NotPresent) => Ok(None),
    Err(env::VarError::NotUnicode(value)) => Err(HeapError::InvalidEnv {
      var,
      value: value.to_string_lossy().into_owned(),
    }),
  }
}

fn parse_size(
  var: &'static str,
  value: String,
) -> Result<usize> {
  value
    .trim()
    .parse()
    .map_err(|_| HeapError::InvalidEnv { var, value })
}
