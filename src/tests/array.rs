use core::mem::MaybeUninit;

use crate::array::Array;
use crate::params::CACHE_LINE;

#[test]
fn test_alignment() {
  for len in [1_usize, 16, 1024, 1 << 16] {
    let array: Array<usize> = Array::new(len, |index| index);

    assert_eq!(
      array.as_slice().as_ptr().addr() & (CACHE_LINE - 1),
      0,
      "invalid array: pointer not properly aligned for len={len}",
    );
  }
}

#[test]
fn test_new_initializes_every_element() {
  let array: Array<usize> = Array::new(64, |index| index * 2);

  for (index, value) in array.as_slice().iter().enumerate() {
    assert_eq!(*value, index * 2);
  }
}

#[test]
fn test_len_matches_requested_length() {
  let array: Array<u8> = Array::new(37, |_| 0);
  assert_eq!(array.len(), 37);
  assert_eq!(array.as_slice().len(), 37);
}

#[test]
fn test_get_unchecked_matches_slice_indexing() {
  let array: Array<usize> = Array::new(8, |index| index + 100);

  for index in 0..array.len() {
    // SAFETY: `index` is in `0..array.len()`.
    assert_eq!(unsafe { *array.get_unchecked(index) }, array.as_slice()[index]);
  }
}

#[test]
fn test_new_uninit_then_assume_init() {
  let uninit: Array<MaybeUninit<u32>> = Array::new_uninit(4);

  // SAFETY: every slot is written below before `assume_init` reads it back.
  let array: Array<u32> = unsafe {
    for index in 0..uninit.len() {
      uninit.get_unchecked(index).as_ptr().cast_mut().write(index as u32 * 10);
    }

    uninit.assume_init()
  };

  assert_eq!(array.as_slice(), &[0, 10, 20, 30]);
}

#[test]
fn test_drop_runs_for_every_element() {
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;

  struct DropCounter<'a>(&'a AtomicUsize);

  impl Drop for DropCounter<'_> {
    fn drop(&mut self) {
      self.0.fetch_add(1, Ordering::Relaxed);
    }
  }

  let counter = AtomicUsize::new(0);

  {
    let _array: Array<DropCounter<'_>> = Array::new(16, |_| DropCounter(&counter));
  }

  assert_eq!(counter.load(Ordering::Relaxed), 16);
}
