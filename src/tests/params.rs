use crate::params::Capacity;
use crate::params::ConstParams;
use crate::params::DefaultParams;
use crate::params::Mapping;
use crate::params::Params;
use crate::params::ParamsExt;
use crate::params::Probing;

#[test]
fn test_capacity_min() {
  assert_eq!(
    Capacity::new(1).as_usize(),
    Capacity::MIN.as_usize(),
    "invalid capacity: expected clamp to MIN",
  );
}

#[test]
fn test_capacity_max() {
  assert_eq!(
    Capacity::new(1 << 30).as_usize(),
    Capacity::MAX.as_usize(),
    "invalid capacity: expected clamp to MAX",
  );
}

#[test]
fn test_capacity_round_up() {
  assert_eq!(
    Capacity::new((1 << 13) - 25).as_usize(),
    1 << 13,
    "invalid capacity: expected round up",
  );
}

#[test]
fn test_capacity_exact() {
  assert_eq!(
    Capacity::new(1 << 13).as_usize(),
    1 << 13,
    "invalid capacity: expected no change",
  );
}

#[test]
fn test_capacity_scaled() {
  assert_eq!(Capacity::new(1 << 13).scaled(2).as_usize(), 1 << 14);
  assert_eq!(
    Capacity::MAX.scaled(2).as_usize(),
    Capacity::MAX.as_usize(),
    "scaling past MAX clamps",
  );
}

#[test]
fn test_capacity_log2_roundtrips() {
  each_capacity!({
    let capacity: Capacity = P::INITIAL_CAPACITY;
    assert_eq!(1usize << capacity.log2(), capacity.as_usize());
  });
}

#[test]
fn test_default_params_matches_documented_defaults() {
  assert_eq!(DefaultParams::INITIAL_CAPACITY.as_usize(), 4096);
  assert!((DefaultParams::MAX_FILL_FACTOR - 2.0 / 3.0).abs() < f32::EPSILON);
  assert!(DefaultParams::GROWTH_SUPPORTED);
  assert!(DefaultParams::DELETIONS_SUPPORTED);
}

#[test]
fn test_const_params_sets_only_initial_capacity() {
  type P = ConstParams<4096>;

  assert_eq!(P::INITIAL_CAPACITY.as_usize(), 4096);
  assert_eq!(P::MAX_FILL_FACTOR, DefaultParams::MAX_FILL_FACTOR);
  assert_eq!(P::BLOCK_SIZE, DefaultParams::BLOCK_SIZE);
  assert_eq!(P::MAX_HANDLES, DefaultParams::MAX_HANDLES);
}

#[test]
fn test_validate_accepts_every_default_capacity() {
  each_capacity!({
    <P as ParamsExt>::validate();
  });
}

#[test]
#[should_panic(expected = "Mapping::HighBits")]
fn test_validate_rejects_high_bits_with_cyclic() {
  #[derive(Clone, Copy, Debug)]
  struct BadParams;

  impl Params for BadParams {
    const MAPPING: Mapping = Mapping::HighBits;
    const PROBING: Probing = Probing::Cyclic;
  }

  <BadParams as ParamsExt>::validate();
}

#[test]
#[should_panic(expected = "MAX_FILL_FACTOR")]
fn test_validate_rejects_fill_factor_out_of_range() {
  #[derive(Clone, Copy, Debug)]
  struct BadParams;

  impl Params for BadParams {
    const MAX_FILL_FACTOR: f32 = 1.0;
  }

  <BadParams as ParamsExt>::validate();
}

#[test]
fn test_debug_includes_every_knob() {
  let rendered: String = format!("{:?}", DefaultParams::debug());

  for field in [
    "INITIAL_CAPACITY",
    "MAX_FILL_FACTOR",
    "BLOCK_SIZE",
    "MAPPING",
    "PROBING",
    "GROWTH_SUPPORTED",
    "DELETIONS_SUPPORTED",
    "MAX_HANDLES",
  ] {
    assert!(rendered.contains(field), "debug output missing `{field}`: {rendered}");
  }
}
