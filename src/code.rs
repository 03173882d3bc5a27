//! Return-code taxonomy shared by every table operation.

/// The outcome of a table operation, shared by the internal base table and
/// the public [`GrowTable`](crate::GrowTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum OpCode {
  /// A new key was inserted.
  SuccessIn,
  /// An existing key's value was updated.
  SuccessUp,
  /// A key was deleted.
  SuccessDel,
  /// `insert` found the key already present; nothing was changed.
  UnsuccessAlready,
  /// `update`/`remove`/`remove_if` found no matching live key.
  UnsuccessNotFound,
  /// The table (or its current generation) has no room for the key.
  UnsuccessFull,
  /// The operation raced a migration mark on the slot it was about to
  /// commit to and must be retried against a newer generation.
  UnsuccessInvalid,
}

impl OpCode {
  /// Returns `true` if this code represents a successful operation.
  #[inline]
  #[must_use]
  pub const fn is_success(self) -> bool {
    matches!(self, Self::SuccessIn | Self::SuccessUp | Self::SuccessDel)
  }

  /// Returns `true` if this code means the caller should retry against the
  /// table's current (possibly newer) generation.
  #[inline]
  #[must_use]
  pub const fn should_retry(self) -> bool {
    matches!(self, Self::UnsuccessInvalid)
  }
}
