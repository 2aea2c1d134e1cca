/*!
[`DelayData`]: the immutable per-task delay estimate that flows through
the whole engine.
*/

use crate::handles::VlinkId;

/// `(vlink, dmin, jit)` with `dmax` derived as `dmin + jit`. Readiness
/// is modeled by wrapping this type in `Option` at call sites rather
/// than an internal flag, since every consumer of a not-yet-ready
/// `DelayData` is a programming error (the original's `_ready` bool
/// just guarded the same invariant at runtime).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayData
{
	vlink: VlinkId,
	dmin: i64,
	jit: i64,
}

impl DelayData
{
	pub fn new(vlink: VlinkId, dmin: i64, jit: i64) -> Self
	{
		debug_assert!(dmin >= 0);
		debug_assert!(jit >= 0);
		DelayData { vlink, dmin, jit }
	}

	pub fn vlink(&self) -> VlinkId
	{
		self.vlink
	}

	pub fn dmin(&self) -> i64
	{
		self.dmin
	}

	pub fn jit(&self) -> i64
	{
		self.jit
	}

	pub fn dmax(&self) -> i64
	{
		self.dmin + self.jit
	}
}
