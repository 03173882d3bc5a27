use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::marker::PhantomData;
use core::mem;
use core::num::NonZeroUsize;

use crate::padded::CachePadded;
use crate::sync::atomic::AtomicUsize;

// -----------------------------------------------------------------------------
// Cache-line Properties
// -----------------------------------------------------------------------------

/// The size of a cache line in bytes.
///
/// Used to align handle/registry slots to minimize false sharing between
/// threads. On most modern x86-64 systems, this is 64 bytes.
pub const CACHE_LINE: usize = size_of::<CachePadded<u8>>();

/// The number of pointer-sized words that fit in a single cache line.
pub const CACHE_LINE_SLOTS: usize = CACHE_LINE / size_of::<AtomicUsize>();

const _: () = assert!(
  CACHE_LINE.is_multiple_of(size_of::<AtomicUsize>()),
  "invalid params: `CACHE_LINE` must be a multiple of pointer width",
);

const _: () = assert!(
  CACHE_LINE.is_power_of_two(),
  "invalid params: `CACHE_LINE` must be a power of two",
);

// -----------------------------------------------------------------------------
// Mapping / Probing Policy
// -----------------------------------------------------------------------------

/// How a key's hash is mapped to its home slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Mapping {
  /// Home index is the low `log2(capacity)` bits of the hash.
  ///
  /// Simple masking; cheap, but keeps no special relationship between a
  /// key's home index across table generations.
  LowBits,

  /// Home index is the high `log2(capacity)` bits of the hash.
  ///
  /// Growing the table by a power-of-two factor `f` maps a slot's old home
  /// index `h` into the contiguous range `[h*f, h*f + f)` of the new
  /// capacity, which is what makes per-block target zero-initialization
  /// during migration embarrassingly parallel (see [`crate::migration`]).
  HighBits,
}

/// How probing continues from a key's home index on collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Probing {
  /// Wrap back to index `0` once the end of the table is reached.
  Cyclic,

  /// Probe strictly forward into a small fixed overflow tail appended past
  /// the addressable capacity, so in-range probes never need a modulo.
  /// Probing past the overflow tail reports `UNSUCCESS_FULL`.
  LinearWithOverflow,
}

/// The number of slots appended past `capacity` when using
/// [`Probing::LinearWithOverflow`].
pub const OVERFLOW_TAIL: usize = 128;

// -----------------------------------------------------------------------------
// Configurable Params
// -----------------------------------------------------------------------------

/// Compile-time configuration for a [`GrowTable`].
///
/// [`GrowTable`]: crate::growable::GrowTable
pub trait Params: Sized + Send + Sync + 'static {
  /// The capacity of the first base-table generation.
  const INITIAL_CAPACITY: Capacity = DefaultParams::INITIAL_CAPACITY;

  /// The load factor (live slots / capacity) past which a handle triggers
  /// a grow.
  const MAX_FILL_FACTOR: f32 = 2.0 / 3.0;

  /// The number of slots claimed per `fetch_add` during migration.
  const BLOCK_SIZE: usize = 4096;

  /// How a key's hash is mapped to its home slot.
  const MAPPING: Mapping = Mapping::HighBits;

  /// How probing continues past a key's home slot.
  const PROBING: Probing = Probing::LinearWithOverflow;

  /// Whether the table is allowed to migrate to a larger generation.
  ///
  /// When `false`, deleted slots are reused in place (the base table never
  /// migrates, so there is no cross-generation tombstone hazard).
  const GROWTH_SUPPORTED: bool = true;

  /// Whether `remove`/`remove_if` are enabled.
  const DELETIONS_SUPPORTED: bool = true;

  /// The maximum number of concurrently registered handles.
  ///
  /// Bounds the sync exclusion strategy's handle registry; exceeding it is
  /// a programmer error and panics at [`GrowTable::handle`][h] time.
  ///
  /// [h]: crate::growable::GrowTable::handle
  const MAX_HANDLES: usize = 256;

  /// The number of local operations a [`Handle`] performs before folding
  /// its counters into the table-wide approximate counters.
  ///
  /// [`Handle`]: crate::handle::Handle
  const COUNTER_FLUSH_INTERVAL: u32 = 64;
}

// -----------------------------------------------------------------------------
// Configurable Params - Extensions
// -----------------------------------------------------------------------------

/// Derived parameters computed from [`Params`].
pub trait ParamsExt: Params + Sealed {
  fn validate() {
    assert!(
      Self::MAX_FILL_FACTOR > 0.0 && Self::MAX_FILL_FACTOR < 1.0,
      "invalid params: `MAX_FILL_FACTOR` must be in `(0.0, 1.0)`",
    );
    assert!(Self::BLOCK_SIZE > 0, "invalid params: `BLOCK_SIZE` must be non-zero");
    assert!(Self::MAX_HANDLES > 0, "invalid params: `MAX_HANDLES` must be non-zero");
    assert!(
      !matches!(Self::MAPPING, Mapping::HighBits) || matches!(Self::PROBING, Probing::LinearWithOverflow),
      "invalid params: `Mapping::HighBits` only pairs with `Probing::LinearWithOverflow`",
    );
  }

  #[inline]
  fn debug() -> DebugParams<Self> {
    DebugParams {
      marker: PhantomData,
    }
  }
}

// -----------------------------------------------------------------------------
// Debug Params
// -----------------------------------------------------------------------------

/// A helper type for displaying [`Params`] configuration.
#[derive(Clone, Copy)]
pub struct DebugParams<P>
where
  P: ?Sized,
{
  marker: PhantomData<fn(P)>,
}

impl<P> Debug for DebugParams<P>
where
  P: Params + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct(core::any::type_name::<P>())
      .field("INITIAL_CAPACITY", &P::INITIAL_CAPACITY)
      .field("MAX_FILL_FACTOR", &P::MAX_FILL_FACTOR)
      .field("BLOCK_SIZE", &P::BLOCK_SIZE)
      .field("MAPPING", &P::MAPPING)
      .field("PROBING", &P::PROBING)
      .field("GROWTH_SUPPORTED", &P::GROWTH_SUPPORTED)
      .field("DELETIONS_SUPPORTED", &P::DELETIONS_SUPPORTED)
      .field("MAX_HANDLES", &P::MAX_HANDLES)
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Default Params
// -----------------------------------------------------------------------------

/// The default configuration: 4,096 initial slots, growable, deletions
/// enabled.
#[derive(Clone, Copy)]
#[non_exhaustive]
pub struct DefaultParams;

impl Debug for DefaultParams {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&<Self as ParamsExt>::debug(), f)
  }
}

impl Params for DefaultParams {
  const INITIAL_CAPACITY: Capacity = Capacity::new(4096);
}

// -----------------------------------------------------------------------------
// Const-Generic Params
// -----------------------------------------------------------------------------

/// A [`Params`] implementation with a compile-time configurable initial
/// capacity and every other knob left at its default.
///
/// ```
/// use growt::{GrowTable, ConstParams};
///
/// type SmallTable<V> = GrowTable<V, ConstParams<64>>;
/// ```
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub struct ConstParams<const N: usize>;

impl<const N: usize> Params for ConstParams<N> {
  const INITIAL_CAPACITY: Capacity = Capacity::new(N);
}

// -----------------------------------------------------------------------------
// Auto-implement Derive
// -----------------------------------------------------------------------------

mod private {
  pub trait Sealed {}
}

use private::Sealed;

impl<P> Sealed for P where P: Params + ?Sized {}
impl<P> ParamsExt for P where P: Params + ?Sized {}

// -----------------------------------------------------------------------------
// Capacity
// -----------------------------------------------------------------------------

/// A validated, power-of-two base-table capacity.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Capacity(usize);

impl Capacity {
  /// The minimum supported capacity: 4,096 slots.
  pub const MIN: Self = Self(1 << 12);

  /// The maximum supported capacity: 2³⁰ slots.
  pub const MAX: Self = Self(1 << 30);

  /// Creates a new `Capacity` from an arbitrary value.
  ///
  /// The value is rounded up to the nearest power of two and clamped to
  /// [`MIN`]`..=`[`MAX`].
  ///
  /// [`MIN`]: Self::MIN
  /// [`MAX`]: Self::MAX
  #[inline]
  pub const fn new(value: usize) -> Self {
    let Some(capacity) = value.checked_next_power_of_two() else {
      return Self::MAX;
    };

    if capacity < Self::MIN.as_usize() {
      Self::MIN
    } else if capacity > Self::MAX.as_usize() {
      Self::MAX
    } else {
      Self(capacity)
    }
  }

  /// Returns the capacity as a [`usize`].
  #[inline]
  pub const fn as_usize(self) -> usize {
    self.0
  }

  /// Returns the base-2 logarithm of the capacity.
  #[inline]
  pub const fn log2(self) -> u32 {
    self.0.trailing_zeros()
  }

  /// Returns a capacity scaled by `factor` (itself a power of two),
  /// clamped to [`MAX`].
  ///
  /// [`MAX`]: Self::MAX
  #[inline]
  pub(crate) const fn scaled(self, factor: usize) -> Self {
    match self.0.checked_mul(factor) {
      Some(value) if value <= Self::MAX.as_usize() => Self(value),
      _ => Self::MAX,
    }
  }
}

impl Debug for Capacity {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{:?} (1 << {:?})", self.0, self.log2())
  }
}

impl Default for Capacity {
  #[inline]
  fn default() -> Capacity {
    DefaultParams::INITIAL_CAPACITY
  }
}

impl From<Capacity> for NonZeroUsize {
  #[inline]
  fn from(other: Capacity) -> NonZeroUsize {
    // SAFETY: all `Capacity` values are non-zero powers of two.
    unsafe { NonZeroUsize::new_unchecked(other.as_usize()) }
  }
}

impl From<Capacity> for usize {
  #[inline]
  fn from(other: Capacity) -> usize {
    other.as_usize()
  }
}

const _: () = {
  // Keep `Capacity` the width of a `usize` so call sites can pass it
  // around cheaply; `mem` stays imported for this assertion.
  assert!(mem::size_of::<Capacity>() == mem::size_of::<usize>());
};
