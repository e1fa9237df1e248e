use std::{mem, ptr::NonNull};

use rcollector::{ExplicitRoots, Gc, HeapCreateInfo};

const MIN_STRING_LEN: usize = 32;

/// Laid out inside collector payloads, so every field that points to
/// another block is visible to the heap scan.
#[repr(C)]
struct Garbage {
  size: usize,
  name: *mut u8,
  array: *mut i32,
}

fn addr<T>(ptr: NonNull<T>) -> usize {
  ptr.as_ptr() as usize
}

/// Allocates a `Garbage` plus its name and array, writes into all three
/// and returns the struct.
unsafe fn make_garbage(
  gc: &mut Gc,
  label: &str,
  size: usize,
  first: i32,
) -> NonNull<Garbage> {
  let garbage = gc.allocate(mem::size_of::<Garbage>()).unwrap().cast::<Garbage>();
  // Keep the struct rooted while its fields are allocated.
  gc.roots_mut().push(addr(garbage));
  let name = gc.allocate(MIN_STRING_LEN).unwrap();
  let array = gc.allocate(size * mem::size_of::<i32>()).unwrap().cast::<i32>();
  gc.roots_mut().pop();

  unsafe {
    garbage.as_ptr().write(Garbage {
      size,
      name: name.as_ptr(),
      array: array.as_ptr(),
    });

    let bytes = label.as_bytes();
    let len = bytes.len().min(MIN_STRING_LEN - 1);
    name.as_ptr().copy_from_nonoverlapping(bytes.as_ptr(), len);
    name.as_ptr().add(len).write(0);

    for i in 0..size {
      array.as_ptr().add(i).write(first + i as i32);
    }
  }

  println!("{label} struct at {:#x}", addr(garbage));
  println!("{label} name at {:#x}", addr(name));
  println!("{label} array at {:#x}", addr(array));
  garbage
}

/// Each level pushes a frame, roots its own garbage in it, recurses, and
/// drops the frame on the way back out.
fn recursion_gen_garbage(
  gc: &mut Gc,
  times: usize,
) {
  if times == 0 {
    return;
  }

  println!("\n========== recursion {times} ==========");
  let frame = gc.roots().depth();
  let garbage = unsafe { make_garbage(gc, "function_garbage", 30, 0) };
  gc.roots_mut().push(addr(garbage));

  recursion_gen_garbage(gc, times - 1);

  gc.roots_mut().truncate(frame);
}

fn main() {
  env_logger::init();

  let mut gc = Gc::new(HeapCreateInfo::default(), ExplicitRoots::new()).unwrap();
  gc.init();

  // --------------------------------------------------------------------
  // 1) A global int, held in a static slot.
  // --------------------------------------------------------------------
  let int = gc.allocate(mem::size_of::<i32>()).unwrap().cast::<i32>();
  unsafe { int.as_ptr().write(1024) };
  gc.roots_mut().add_static(addr(int));
  println!("global int at {:#x}", addr(int));

  // --------------------------------------------------------------------
  // 2) A global struct: its fields are static slots too.
  // --------------------------------------------------------------------
  let global = unsafe { make_garbage(&mut gc, "global_garbage", 10, 1014) };
  let (name, array) = unsafe { ((*global.as_ptr()).name as usize, (*global.as_ptr()).array as usize) };
  gc.roots_mut().add_static(name);
  gc.roots_mut().add_static(array);

  // --------------------------------------------------------------------
  // 3) A local struct in main's frame. Its fields are reached through
  //    the heap scan only.
  // --------------------------------------------------------------------
  let local = unsafe { make_garbage(&mut gc, "main_garbage", 20, 1024) };
  gc.roots_mut().push(addr(local));

  // --------------------------------------------------------------------
  // 4) Garbage from frames that have already returned.
  // --------------------------------------------------------------------
  recursion_gen_garbage(&mut gc, 5);

  let collection = gc.collect();
  println!(
    "\ncollected: {} retained, {} reclaimed ({} bytes)",
    collection.retained, collection.reclaimed, collection.reclaimed_bytes
  );

  gc.print_used();
  gc.print_free();
}
