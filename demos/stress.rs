use std::{process, time::Instant};

use firstfit::{ALIGNMENT, Heap, HeapConfig, Payload};
use log::info;

const HEAP_SIZE: usize = 1024 * 1024;
const LOOP_COUNT: usize = 50_000;
const MAX_REQUEST: usize = 1024 * 8;
const SLOTS: usize = 512;

/// Deterministic linear congruential generator.
struct Lcg(u64);

impl Lcg {
  fn next(&mut self) -> u64 {
    self.0 = self
      .0
      .wrapping_mul(6364136223846793005)
      .wrapping_add(1442695040888963407);
    self.0 >> 33
  }
}

fn main() {
  pretty_env_logger::init();

  let config = match HeapConfig::new(HEAP_SIZE, ALIGNMENT) {
    Ok(config) => config,
    Err(err) => {
      eprintln!("invalid configuration: {err}");
      process::exit(1);
    }
  };

  let mut heap = Heap::new(config);

  // A request far larger than the whole region must fail cleanly.
  let oversized = 6 * HEAP_SIZE;
  match heap.allocate(oversized) {
    Some(_) => println!("allocation of {oversized} bytes unexpectedly succeeded"),
    None => println!("allocation of {oversized} bytes failed, as expected"),
  }

  let mut slots: Vec<Option<Payload>> = vec![None; SLOTS];
  let mut rng = Lcg(0x5EED);
  let mut succeeded = 0usize;
  let mut failed = 0usize;

  let start = Instant::now();

  for _ in 0..LOOP_COUNT {
    let slot = rng.next() as usize % SLOTS;

    if let Some(payload) = slots[slot].take() {
      heap.release(payload);
      continue;
    }

    let size = rng.next() as usize % MAX_REQUEST + 1;

    match heap.allocate(size) {
      Some(payload) => {
        succeeded += 1;
        slots[slot] = Some(payload);
      }
      None => failed += 1,
    }
  }

  let elapsed = start.elapsed();
  let stats = heap.stats();

  info!(
    "{} blocks, {} free, largest free {} bytes",
    stats.blocks, stats.free_blocks, stats.largest_free
  );

  println!(
    "Loop count: {}, malloc successful: {}, malloc failed: {}, execution time: {:.2} seconds",
    LOOP_COUNT,
    succeeded,
    failed,
    elapsed.as_secs_f64()
  );
}
