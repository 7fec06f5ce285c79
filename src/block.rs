use std::mem;

/// Machine words in an encoded descriptor: size, status, next, prev.
pub const DESCRIPTOR_WORDS: usize = 4;

const WORD: usize = mem::size_of::<usize>();
const NIL: usize = usize::MAX;

/// Metadata prefixing every block of the region, free or occupied.
///
/// Links are byte offsets of the neighbouring descriptors inside the
/// region, in address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub size: usize,
  pub occupied: bool,
  pub next: Option<usize>,
  pub prev: Option<usize>,
}

impl Block {
  pub fn new(
    size: usize,
    occupied: bool,
    next: Option<usize>,
    prev: Option<usize>,
  ) -> Self {
    Self {
      size,
      occupied,
      next,
      prev,
    }
  }

  /// Decodes the descriptor stored at `offset`.
  pub fn read(
    region: &[u8],
    offset: usize,
  ) -> Self {
    let word = |i: usize| read_word(region, offset + i * WORD);

    Self {
      size: word(0),
      occupied: word(1) != 0,
      next: link(word(2)),
      prev: link(word(3)),
    }
  }

  /// Encodes this descriptor at `offset`.
  pub fn write(
    &self,
    region: &mut [u8],
    offset: usize,
  ) {
    let words = [
      self.size,
      self.occupied as usize,
      self.next.unwrap_or(NIL),
      self.prev.unwrap_or(NIL),
    ];

    for (i, word) in words.into_iter().enumerate() {
      write_word(region, offset + i * WORD, word);
    }
  }
}

fn link(word: usize) -> Option<usize> {
  (word != NIL).then_some(word)
}

fn read_word(
  region: &[u8],
  at: usize,
) -> usize {
  let mut bytes = [0u8; WORD];
  bytes.copy_from_slice(&region[at..at + WORD]);
  usize::from_ne_bytes(bytes)
}

fn write_word(
  region: &mut [u8],
  at: usize,
  word: usize,
) {
  region[at..at + WORD].copy_from_slice(&word.to_ne_bytes());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_read_back() {
    let mut region = vec![0u8; 4 * DESCRIPTOR_WORDS * WORD];

    let head = Block::new(992, false, None, None);
    let tail = Block::new(104, true, Some(64), Some(0));

    head.write(&mut region, 0);
    tail.write(&mut region, 2 * DESCRIPTOR_WORDS * WORD);

    assert_eq!(Block::read(&region, 0), head);
    assert_eq!(Block::read(&region, 2 * DESCRIPTOR_WORDS * WORD), tail);
  }

  #[test]
  fn test_write_stays_in_place() {
    let mut region = vec![0xAAu8; 3 * DESCRIPTOR_WORDS * WORD];
    let at = DESCRIPTOR_WORDS * WORD;

    Block::new(1, true, Some(0), None).write(&mut region, at);

    assert!(region[..at].iter().all(|&b| b == 0xAA));
    assert!(region[2 * at..].iter().all(|&b| b == 0xAA));
  }

  #[test]
  #[should_panic]
  fn test_read_out_of_bounds() {
    let region = vec![0u8; DESCRIPTOR_WORDS * WORD];

    Block::read(&region, WORD);
  }
}
