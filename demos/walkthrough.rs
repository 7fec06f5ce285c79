use std::process;

use firstfit::{Heap, HeapConfig, Payload};
use log::info;

/// Prints every block of the heap, in address order.
fn print_blocks(
  label: &str,
  heap: &Heap,
) {
  println!("\n[{label}]");
  for block in heap.dump_free_list() {
    println!("  {block}");
  }
  heap.print_free_list();
}

fn allocate(
  heap: &mut Heap,
  size: usize,
) -> Payload {
  match heap.allocate(size) {
    Some(payload) => payload,
    None => {
      eprintln!("allocation of {size} bytes failed");
      process::exit(1);
    }
  }
}

fn main() {
  pretty_env_logger::init();

  let config = match HeapConfig::from_env() {
    Ok(config) => config,
    Err(err) => {
      eprintln!("invalid configuration: {err}");
      process::exit(1);
    }
  };

  let mut heap = Heap::new(config);

  if !heap.init() {
    eprintln!("could not reserve {} bytes", config.region_size());
    process::exit(1);
  }

  info!(
    "region of {} bytes, descriptor {} bytes, alignment {}",
    config.region_size(),
    config.descriptor_size(),
    config.alignment()
  );
  print_blocks("init", &heap);

  // --------------------------------------------------------------------
  // 1) Basic: allocate, write, release.
  // --------------------------------------------------------------------
  let first = allocate(&mut heap, 100);
  heap.payload_mut(first)[..4].copy_from_slice(&0xDEADBEEFu32.to_ne_bytes());
  print_blocks("allocate 100", &heap);

  heap.release(first);
  print_blocks("release 100", &heap);

  // --------------------------------------------------------------------
  // 2) Coalesce: free the outer blocks, then the middle one.
  //    The middle release merges all three into a single free block.
  // --------------------------------------------------------------------
  let left = allocate(&mut heap, 40);
  let middle = allocate(&mut heap, 48);
  let right = allocate(&mut heap, 56);
  let guard = allocate(&mut heap, 8);
  print_blocks("allocate 40, 48, 56, 8", &heap);

  heap.release(left);
  heap.release(right);
  print_blocks("release 40 and 56", &heap);

  heap.release(middle);
  print_blocks("release 48", &heap);

  heap.release(guard);
  print_blocks("release 8", &heap);

  let stats = heap.stats();
  println!(
    "\n{} block(s), {} free bytes, largest free block {} bytes",
    stats.blocks, stats.free_bytes, stats.largest_free
  );
}
