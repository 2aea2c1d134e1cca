/*!
QRTA: Queueing Response Time Analysis at one scheduling element (a
switching fabric or an output port). Every contributing
VL's arrival curve is `ceil((t+jit)/bag) * smax` bytes in any window of
length `t`; the worst-case response time of a target VL is the classic
busy-period analysis: find the fixed point of the backlog recursion,
then scan the target's own arrival instants within one busy period for
the worst queueing delay. All quantities are expressed in link-bytes,
so the server's rate is simply 1.
*/

use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::delay::DelayData;
use crate::handles::{ElemKind, QrtaId, VlinkId};
use crate::topology::Vlink;
use crate::units;

#[derive(Clone, Debug)]
pub struct Qrta
{
	pub id: QrtaId,
	pub kind: ElemKind,
	/// Every VL contending for this element, with the upstream delay
	/// data (dmin/jit) it arrives with. Refreshed in place as the
	/// cyclic fixed-point pass revises upstream jitter.
	contributors: Vec<(VlinkId, DelayData)>,
}

impl Qrta
{
	pub fn new(id: QrtaId, kind: ElemKind) -> Self
	{
		Qrta { id, kind, contributors: Vec::new() }
	}

	pub fn set_contributor(&mut self, vl: VlinkId, data: DelayData)
	{
		match self.contributors.iter_mut().find(|(v, _)| *v == vl)
		{
			Some(slot) => slot.1 = data,
			None => self.contributors.push((vl, data)),
		}
	}

	pub fn contributors(&self) -> &[(VlinkId, DelayData)]
	{
		&self.contributors
	}

	/// Σ smax_i/bag_i over every contributor: must stay below 1 for a
	/// finite busy period to exist.
	pub fn total_rate(&self, vlinks: &BTreeMap<VlinkId, Vlink>) -> f64
	{
		self.contributors
			.iter()
			.map(|(vl, _)| {
				let v = &vlinks[vl];
				v.smax as f64 / v.bag_b as f64
			})
			.sum()
	}

	/// Smallest `bp` solving `bp = Σ ceil((bp+jit_i)/bag_i) * smax_i`.
	pub fn calc_bp(&self, vlinks: &BTreeMap<VlinkId, Vlink>, bp_max_iter: u64) -> Result<i64>
	{
		if self.contributors.is_empty()
		{
			return Ok(0);
		}
		if self.total_rate(vlinks) >= 1.0
		{
			return Err(EngineError::BpEndless(format!(
				"element has {} contributors summing to a load of {:.6}, which never drains",
				self.contributors.len(),
				self.total_rate(vlinks)
			)));
		}
		let mut bp = self.contributors.iter().map(|(vl, _)| vlinks[vl].smax).max().unwrap_or(0);
		for _ in 0..bp_max_iter
		{
			let next: i64 = self
				.contributors
				.iter()
				.map(|(vl, d)| {
					let v = &vlinks[vl];
					units::num_packets(bp, v.bag_b, d.jit()) * v.smax
				})
				.sum();
			if next == bp
			{
				return Ok(bp);
			}
			bp = next;
		}
		Err(EngineError::BpTooLong(format!("busy period did not converge within {bp_max_iter} iterations")))
	}

	/// `D_k(t)`, the backlog `target` would see from every contributor
	/// (itself included, with its own jitter forced to zero) if its own
	/// packet arrived at time `t`, maximised over every candidate `t` in
	/// `[0, bp - smax_k]`: target's own arrival instants, plus every other
	/// contributor's jitter-shifted arrival instants.
	fn d_k_max(&self, vlinks: &BTreeMap<VlinkId, Vlink>, target: VlinkId, bp: i64) -> i64
	{
		let tv = &vlinks[&target];
		let limit = bp - tv.smax;
		if limit < 0
		{
			return 0;
		}
		let mut candidates = Vec::new();
		let mut t = 0;
		while t <= limit
		{
			candidates.push(t);
			t += tv.bag_b;
		}
		for (vl, d) in &self.contributors
		{
			if *vl == target
			{
				continue;
			}
			let v = &vlinks[vl];
			let mut t = units::round_to_multiple(d.jit(), v.bag_b) - d.jit();
			while t <= limit
			{
				if t >= 0
				{
					candidates.push(t);
				}
				t += v.bag_b;
			}
		}
		let mut worst = 0;
		for t in candidates
		{
			let sum: i64 = self
				.contributors
				.iter()
				.map(|(vl, d)| {
					let v = &vlinks[vl];
					let jit = if *vl == target { 0 } else { d.jit() };
					units::num_packets_up(t, v.bag_b, jit) * v.smax
				})
				.sum();
			let val = sum - t;
			if val > worst
			{
				worst = val;
			}
		}
		worst
	}

	/// `D_k*(q)`, the alternate busy-period-remainder bound scanned over
	/// `q` in `[numPacketsUp(bp - smin_k, bag_k, 0), numPackets(bp, bag_k,
	/// jit_k)]`: `target`'s own contribution counts `q` whole packets,
	/// every other contributor counts what it could have injected by
	/// `min(bp - smax_k, (q-1)*bag_k)`.
	fn d_k_star_max(&self, vlinks: &BTreeMap<VlinkId, Vlink>, target: VlinkId, bp: i64) -> i64
	{
		let tv = &vlinks[&target];
		let target_jit = self.contributors.iter().find(|(vl, _)| *vl == target).map(|(_, d)| d.jit()).unwrap_or(0);
		let q_min = units::num_packets_up(units::ramp(bp - tv.smin), tv.bag_b, 0);
		let q_max = units::num_packets(bp, tv.bag_b, target_jit);
		let mut worst = 0;
		let mut q = q_min;
		while q <= q_max
		{
			let sum: i64 = self
				.contributors
				.iter()
				.map(|(vl, d)| {
					let v = &vlinks[vl];
					if *vl == target
					{
						v.smax * q
					}
					else
					{
						let t = units::ramp(std::cmp::min(bp - tv.smax, (q - 1) * tv.bag_b));
						v.smax * units::num_packets_up(t, v.bag_b, d.jit())
					}
				})
				.sum();
			let val = std::cmp::min(bp, sum) - (q - 1) * tv.bag_b;
			if val > worst
			{
				worst = val;
			}
			q += 1;
		}
		worst
	}

	/// Worst-case per-element queueing delay for `target`: `max(D_k,
	/// D_k*)` over one busy period.
	pub fn delay_func(&self, vlinks: &BTreeMap<VlinkId, Vlink>, target: VlinkId, bp: i64) -> i64
	{
		std::cmp::max(self.d_k_max(vlinks, target, bp), self.d_k_star_max(vlinks, target, bp))
	}

	/// Full per-element delay estimate for `target`, accumulated onto the
	/// `DelayData` it arrived at this element with: `dmax = curDelay.dmax
	/// + max(D_k, D_k*)`. `dmin` is carried through unchanged rather than
	/// re-accumulated at every hop, so it stays pinned at the source's
	/// `smin` for the whole path — the conservative choice, since an
	/// under-estimated `dmin` only ever widens the reported jitter.
	pub fn calc(&self, vlinks: &BTreeMap<VlinkId, Vlink>, target: VlinkId, bp_max_iter: u64) -> Result<DelayData>
	{
		let bp = self.calc_bp(vlinks, bp_max_iter)?;
		let w = self.delay_func(vlinks, target, bp);
		let cur = self.contributors.iter().find(|(vl, _)| *vl == target).map(|(_, d)| *d).unwrap_or_else(|| DelayData::new(target, 0, 0));
		let dmin = cur.dmin();
		let dmax = cur.dmax() + w;
		Ok(DelayData::new(target, dmin, dmax - dmin))
	}
}
