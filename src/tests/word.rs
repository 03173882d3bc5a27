use crate::sync::atomic::AtomicU64;
use crate::sync::atomic::Ordering;
use crate::word::AtomicUpdate;
use crate::word::Assign;
use crate::word::Increment;
use crate::word::Word;

#[test]
fn test_uint_round_trips() {
  assert_eq!(u64::from_bits(Word::to_bits(42u64)), 42u64);
  assert_eq!(u32::from_bits(Word::to_bits(42u32)), 42u32);
  assert_eq!(u16::from_bits(Word::to_bits(42u16)), 42u16);
  assert_eq!(u8::from_bits(Word::to_bits(42u8)), 42u8);
  assert_eq!(usize::from_bits(Word::to_bits(42usize)), 42usize);
}

#[test]
fn test_bool_round_trips() {
  assert_eq!(bool::from_bits(true.to_bits()), true);
  assert_eq!(bool::from_bits(false.to_bits()), false);
  assert_eq!(true.to_bits(), 1);
  assert_eq!(false.to_bits(), 0);
}

#[test]
fn test_truncating_from_bits_takes_low_bits() {
  assert_eq!(u8::from_bits(0x1_FF), 0xFF);
  assert_eq!(u16::from_bits(0x1_FFFF), 0xFFFF);
}

#[test]
fn test_increment_apply() {
  let step = Increment(5);
  assert_eq!(step.apply(10), 15);
  assert_eq!(step.apply(u64::MAX), u64::MAX.wrapping_add(5), "apply must wrap, matching atomic_apply's fetch_add");
}

#[test]
fn test_increment_atomic_apply_matches_apply() {
  let step = Increment(7);
  let word = AtomicU64::new(100);

  let returned = step.atomic_apply(&word, Ordering::AcqRel);

  assert_eq!(returned, 107);
  assert_eq!(word.load(Ordering::Acquire), 107);
  assert_eq!(returned, step.apply(100));
}

#[test]
fn test_assign_apply_ignores_old_value() {
  let set = Assign(42);
  assert_eq!(set.apply(0), 42);
  assert_eq!(set.apply(999), 42);
}

#[test]
fn test_assign_atomic_apply_matches_apply() {
  let set = Assign(7);
  let word = AtomicU64::new(100);

  let returned = set.atomic_apply(&word, Ordering::AcqRel);

  assert_eq!(returned, 7);
  assert_eq!(word.load(Ordering::Acquire), 7);
}
