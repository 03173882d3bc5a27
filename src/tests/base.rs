use crate::base::BaseTable;
use crate::base::Lookup;
use crate::code::OpCode;
use crate::params::Capacity;
use crate::params::ConstParams;
use crate::word::Increment;

type P = ConstParams<64>;

#[test]
fn test_insert_then_find() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);

  assert_eq!(table.insert(1, 100), OpCode::SuccessIn);
  match table.find(1) {
    Lookup::Found(value) => assert_eq!(value, 100),
    _ => panic!("expected to find key 1"),
  }
}

#[test]
fn test_insert_duplicate_reports_already() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);

  assert_eq!(table.insert(1, 100), OpCode::SuccessIn);
  assert_eq!(table.insert(1, 200), OpCode::UnsuccessAlready);

  match table.find(1) {
    Lookup::Found(value) => assert_eq!(value, 100, "the original value must survive a duplicate insert"),
    _ => panic!("expected to find key 1"),
  }
}

#[test]
fn test_find_missing_key_reports_not_found() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  assert!(matches!(table.find(42), Lookup::NotFound));
}

#[test]
fn test_update_existing_key() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  table.insert(1, 10);

  let (code, value) = table.update(1, |old| old + 5);
  assert_eq!(code, OpCode::SuccessUp);
  assert_eq!(value, Some(15));

  match table.find(1) {
    Lookup::Found(value) => assert_eq!(value, 15),
    _ => panic!("expected to find key 1"),
  }
}

#[test]
fn test_update_missing_key_reports_not_found() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  let (code, value) = table.update(1, |old| old + 1);
  assert_eq!(code, OpCode::UnsuccessNotFound);
  assert_eq!(value, None);
}

#[test]
fn test_update_atomic_existing_key() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  table.insert(1, 10);

  let (code, value) = table.update_atomic(1, &Increment(5));
  assert_eq!(code, OpCode::SuccessUp);
  assert_eq!(value, Some(15));
}

#[test]
fn test_insert_or_update_inserts_when_absent() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);

  let (code, value) = table.insert_or_update(1, 7, |old| old + 1);
  assert_eq!(code, OpCode::SuccessIn);
  assert_eq!(value, Some(7));
}

#[test]
fn test_insert_or_update_updates_when_present() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  table.insert(1, 7);

  let (code, value) = table.insert_or_update(1, 0, |old| old + 1);
  assert_eq!(code, OpCode::SuccessUp);
  assert_eq!(value, Some(8));
}

#[test]
fn test_erase_removes_live_key() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  table.insert(1, 10);

  assert_eq!(table.erase(1), OpCode::SuccessDel);
  assert!(matches!(table.find(1), Lookup::NotFound));
}

#[test]
fn test_erase_missing_key_reports_not_found() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  assert_eq!(table.erase(1), OpCode::UnsuccessNotFound);
}

#[test]
fn test_erase_allows_reinsertion_with_different_key() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  table.insert(1, 10);
  table.erase(1);

  assert_eq!(table.insert(2, 20), OpCode::SuccessIn);
  match table.find(2) {
    Lookup::Found(value) => assert_eq!(value, 20),
    _ => panic!("expected to find key 2"),
  }
}

#[test]
fn test_erase_if_respects_predicate() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  table.insert(1, 10);

  assert_eq!(table.erase_if(1, |value| *value > 100), OpCode::UnsuccessNotFound);
  match table.find(1) {
    Lookup::Found(value) => assert_eq!(value, 10, "predicate rejected the delete, value must survive"),
    _ => panic!("expected to find key 1"),
  }

  assert_eq!(table.erase_if(1, |value| *value == 10), OpCode::SuccessDel);
  assert!(matches!(table.find(1), Lookup::NotFound));
}

#[test]
fn test_iter_yields_every_live_entry() {
  type Small = ConstParams<16>;
  let table: BaseTable<u64, Small> = BaseTable::new(Capacity::new(16), 0);

  for key in 1..=8 {
    table.insert(key, key * 10);
  }
  table.erase(4);

  let mut seen: Vec<(u64, u64)> = table.iter().collect();
  seen.sort_unstable();

  let mut expected: Vec<(u64, u64)> = (1..=8).filter(|&k| k != 4).map(|k| (k, k * 10)).collect();
  expected.sort_unstable();

  assert_eq!(seen, expected);
}

#[test]
fn test_full_table_reports_unsuccessful_full() {
  // Fill every reachable slot (home capacity plus the overflow tail under
  // `Probing::LinearWithOverflow`) and confirm the next insert can't find
  // room rather than looping forever.
  type Tiny = ConstParams<16>;
  let table: BaseTable<u64, Tiny> = BaseTable::new(Capacity::new(16), 0);

  let mut inserted: usize = 0;
  for key in 1..100_000u64 {
    match table.insert(key, key) {
      OpCode::SuccessIn => inserted += 1,
      OpCode::UnsuccessFull => break,
      other => panic!("unexpected opcode while filling table: {other:?}"),
    }
  }

  assert!(inserted > 0, "table should accept at least some inserts before filling");
  assert_eq!(table.insert(999_999, 0), OpCode::UnsuccessFull);
}

#[test]
fn test_take_migration_block_is_disjoint_and_exhaustive() {
  let table: BaseTable<u64, P> = BaseTable::new(Capacity::new(64), 0);
  let alloc_len: usize = table.alloc_len();

  let mut covered: Vec<bool> = vec![false; alloc_len];
  let mut total: usize = 0;

  while let Some((start, end)) = table.take_migration_block(7) {
    for index in start..end {
      assert!(!covered[index], "index {index} claimed twice by take_migration_block");
      covered[index] = true;
    }
    total += end - start;
  }

  assert_eq!(total, alloc_len);
  assert!(covered.into_iter().all(|seen| seen));
}
