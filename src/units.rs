/*!
Integer arithmetic kit underlying the arrival-curve semantics used
throughout the engine. Everything here operates on non-negative `i64`
values expressed in link-bytes; preconditions are enforced with debug
assertions rather than `Result`, treating internal arithmetic
invariants as programmer errors rather than recoverable conditions.
*/

/// floor(x/y)
#[inline]
pub fn floordiv(x: i64, y: i64) -> i64
{
	debug_assert!(y > 0);
	x / y
}

/// ceil(x/y), x >= 0, y > 0
#[inline]
pub fn ceildiv(x: i64, y: i64) -> i64
{
	debug_assert!(x >= 0 && y > 0);
	x / y + i64::from(x % y != 0)
}

/// ceil(x/y + 0) from above == floor(x/y) + 1, used where the arrival
/// curve is right-continuous at integer multiples of `y`.
#[inline]
pub fn ceildiv_up(x: i64, y: i64) -> i64
{
	debug_assert!(x >= 0 && y > 0);
	x / y + 1
}

/// max(0, n)
#[inline]
pub fn ramp(n: i64) -> i64
{
	if n >= 0 { n } else { 0 }
}

/// Round `x` up to the nearest multiple of `k` (k > 0).
#[inline]
pub fn round_to_multiple(x: i64, k: i64) -> i64
{
	debug_assert!(k > 0);
	let r = x % k;
	if r == 0 { x } else { x + k - r }
}

/// Maximum number of packets of a VL with the given `bag` and jitter
/// `jit` that can be injected within any interval of duration `intvl`.
#[inline]
pub fn num_packets(intvl: i64, bag: i64, jit: i64) -> i64
{
	debug_assert!(intvl >= 0 && jit >= 0);
	ceildiv(intvl + jit, bag)
}

/// Same as [`num_packets`] but taking the limit from above at multiples
/// of `bag` (used by the delay-function candidate points).
#[inline]
pub fn num_packets_up(intvl: i64, bag: i64, jit: i64) -> i64
{
	debug_assert!(intvl >= 0 && jit >= 0);
	ceildiv_up(intvl + jit, bag)
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn ceildiv_basic()
	{
		assert_eq!(ceildiv(0, 8), 0);
		assert_eq!(ceildiv(1, 8), 1);
		assert_eq!(ceildiv(8, 8), 1);
		assert_eq!(ceildiv(9, 8), 2);
	}

	#[test]
	fn ceildiv_up_is_strict()
	{
		assert_eq!(ceildiv_up(0, 8), 1);
		assert_eq!(ceildiv_up(8, 8), 2);
		assert_eq!(ceildiv(8, 8), 1);
	}

	#[test]
	fn round_to_multiple_basic()
	{
		assert_eq!(round_to_multiple(0, 8), 0);
		assert_eq!(round_to_multiple(1, 8), 8);
		assert_eq!(round_to_multiple(8, 8), 8);
		assert_eq!(round_to_multiple(9, 8), 16);
	}

	#[test]
	fn num_packets_examples()
	{
		// a VL with bag=8 and no jitter can send at most one packet in
		// any half-open interval of length 8.
		assert_eq!(num_packets(0, 8, 0), 0);
		assert_eq!(num_packets(8, 8, 0), 1);
		assert_eq!(num_packets(8, 8, 1), 2);
	}
}
