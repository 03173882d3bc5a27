use crate::key::PackedKey;
use crate::slot::Slot;
use crate::slot::SlotState;
use crate::slot::UpdateOutcome;
use crate::sync::atomic::Ordering;
use crate::word::Assign;
use crate::word::Increment;

#[test]
fn test_new_empty_starts_empty() {
  let slot: Slot<u64> = Slot::new_empty();
  assert_eq!(slot.load(Ordering::Acquire).state(), SlotState::Empty);
}

#[test]
fn test_try_claim_succeeds_once() {
  let slot: Slot<u64> = Slot::new_empty();

  assert!(slot.try_claim(10, 100).is_ok());
  assert_eq!(slot.load(Ordering::Acquire).state(), SlotState::Live);
  assert_eq!(slot.value(Ordering::Acquire), 100);

  let err = slot.try_claim(10, 200).unwrap_err();
  assert_eq!(err.state(), SlotState::Live);
}

#[test]
fn test_try_reclaim_requires_deleted_state() {
  let slot: Slot<u64> = Slot::new_empty();

  assert!(slot.try_reclaim(1, 1).is_err(), "reclaim must fail against an empty slot");

  slot.try_claim(1, 1).unwrap();
  slot.atomic_delete(PackedKey::live(1)).unwrap();
  assert_eq!(slot.load(Ordering::Acquire).state(), SlotState::Deleted);

  assert!(slot.try_reclaim(2, 99).is_ok());
  assert_eq!(slot.load(Ordering::Acquire).state(), SlotState::Live);
  assert_eq!(slot.value(Ordering::Acquire), 99);
}

#[test]
fn test_atomic_mark_freezes_key_state() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(5, 50).unwrap();

  let snapshot = slot.load(Ordering::Acquire);
  let previous = slot.atomic_mark(snapshot.key).unwrap();
  assert!(previous.is_live());

  let after = slot.load(Ordering::Acquire);
  assert!(after.key.is_marked());
  assert_eq!(after.state(), SlotState::MarkedLive);

  // A second mark attempt against the stale (unmarked) snapshot must fail.
  assert!(slot.atomic_mark(snapshot.key).is_err());
}

#[test]
fn test_atomic_delete_transitions_live_to_deleted() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(3, 30).unwrap();

  let key = slot.load(Ordering::Acquire).key;
  assert!(slot.atomic_delete(key).is_ok());
  assert_eq!(slot.load(Ordering::Acquire).state(), SlotState::Deleted);
}

#[test]
fn test_atomic_update_applies_function() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(1, 10).unwrap();

  match slot.atomic_update(|old| old + 5) {
    UpdateOutcome::Updated(new) => assert_eq!(new, 15),
    UpdateOutcome::Invalid => panic!("update on an unmarked slot must not be Invalid"),
  }
  assert_eq!(slot.value(Ordering::Acquire), 15);
}

#[test]
fn test_atomic_update_reports_invalid_once_marked() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(1, 10).unwrap();

  let key = slot.load(Ordering::Acquire).key;
  slot.atomic_mark(key).unwrap();

  match slot.atomic_update(|old| old + 1) {
    UpdateOutcome::Invalid => {}
    UpdateOutcome::Updated(_) => panic!("update against a marked slot must report Invalid"),
  }
}

#[test]
fn test_atomic_update_fast_increment() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(1, 10).unwrap();

  match slot.atomic_update_fast(&Increment(7)) {
    UpdateOutcome::Updated(new) => assert_eq!(new, 17),
    UpdateOutcome::Invalid => panic!("fast update on an unmarked slot must not be Invalid"),
  }
  assert_eq!(slot.value(Ordering::Acquire), 17);
}

#[test]
fn test_atomic_update_fast_assign() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(1, 10).unwrap();

  match slot.atomic_update_fast(&Assign(99)) {
    UpdateOutcome::Updated(new) => assert_eq!(new, 99),
    UpdateOutcome::Invalid => panic!("fast update on an unmarked slot must not be Invalid"),
  }
}

#[test]
fn test_non_atomic_update_requires_exclusive_access() {
  let slot: Slot<u64> = Slot::new_empty();
  slot.try_claim(1, 1).unwrap();

  // SAFETY: single-threaded test, no concurrent access to this slot.
  let new = unsafe { slot.non_atomic_update(|old| old * 10) };

  assert_eq!(new, 10);
  assert_eq!(slot.value(Ordering::Acquire), 10);
}
