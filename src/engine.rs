/*!
Top-level orchestration of the two-phase delay engine: build the task graph, run the acyclic prefix once, then
iterate the cyclic remainder to a fixed point on the total jitter,
grounded on `algo.cpp::VlinkConfig::calcDelays`.
*/

use log::{debug, info, warn};

use crate::delay::DelayData;
use crate::error::{EngineError, Result};
use crate::handles::{DelayTaskId, DeviceId, VlinkId, VnodeId};
use rand::rngs::StdRng;

use crate::task::{self, entry_data};
use crate::topology::Network;

fn run_task(net: &mut Network, id: DelayTaskId, bp_max_iter: u64) -> Result<()>
{
	let task = &net.tasks[id.0];
	let qrta_id = task.qrta;
	let target = task.vl;
	let inputs = task.inputs.clone();

	let mut contributions = Vec::with_capacity(inputs.len());
	for (branch, up) in &inputs
	{
		let data = net.tasks[up.0]
			.output
			.ok_or_else(|| EngineError::CyclicTooLong(format!("task for VL {target} read from VL {} before it was ready", branch.0)))?;
		contributions.push((branch.0, data));
	}
	for (vl, data) in contributions
	{
		net.qrtas[qrta_id.0].set_contributor(vl, data);
	}

	let out = net.qrtas[qrta_id.0].calc(&net.vlinks, target, bp_max_iter)?;
	net.tasks[id.0].output = Some(out);
	Ok(())
}

/// Σ jit over every task in the cyclic remainder, the convergence witness
/// used by [`Network::calc_delays`] (any task not yet run counts as 0).
fn cyclic_jit_sum(net: &Network) -> i64
{
	net.cyclic_order.iter().map(|&id| net.tasks[id.0].output.map(|d| d.jit()).unwrap_or(0)).sum()
}

impl Network
{
	/// Runs the full analysis: builds the per-switch QRTA elements and
	/// delay tasks, orders them, runs the acyclic prefix once and the
	/// cyclic remainder to a fixed point, then extracts each VL's
	/// end-to-end `DelayData` at every destination.
	pub fn calc_delays(&mut self) -> Result<()>
	{
		let build_output = task::build(self, None);
		task::build_task_order(self);
		info!("built {} delay tasks ({} acyclic, {} cyclic)", self.tasks.len(), self.acyclic_order.len(), self.cyclic_order.len());

		for seed in &build_output.seeds
		{
			self.qrtas[seed.qrta.0].set_contributor(seed.vl, seed.data);
		}

		let acyclic = self.acyclic_order.clone();
		for id in acyclic
		{
			run_task(self, id, self.bp_max_iter)?;
		}

		let cyclic = self.cyclic_order.clone();
		if !cyclic.is_empty()
		{
			let mut prev_sum = i64::MIN;
			let mut converged = false;
			for iter in 0..self.cyclic_max_iter
			{
				for &id in &cyclic
				{
					run_task(self, id, self.bp_max_iter)?;
				}
				let sum = cyclic_jit_sum(self);
				debug!("cyclic pass {iter}: Σjit = {sum}");
				if sum == prev_sum
				{
					converged = true;
					break;
				}
				prev_sum = sum;
			}
			if !converged
			{
				return Err(EngineError::CyclicTooLong(format!("cyclic delay propagation did not converge within {} iterations", self.cyclic_max_iter)));
			}
		}

		self.extract_e2e();
		Ok(())
	}

	fn extract_e2e(&mut self)
	{
		let leaves: Vec<VnodeId> = self.vlinks.values().flat_map(|vl| vl.destinations.values().copied()).collect();
		for leaf in leaves
		{
			let data: DelayData = entry_data(self, leaf);
			self.vnode_mut(leaf).e2e = Some(data);
			if data.jit() > data.dmin()
			{
				warn!("VL {} end-to-end jitter ({}) exceeds its minimum delay ({})", data.vlink(), data.jit(), data.dmin());
			}
		}
	}

	/// The computed end-to-end `DelayData` for `vl` at `dest`, once
	/// [`calc_delays`](Self::calc_delays) has run.
	pub fn e2e(&self, vl: VlinkId, dest: DeviceId) -> Option<DelayData>
	{
		let vnode = *self.vlink(vl).destinations.get(&dest)?;
		self.vnode(vnode).e2e
	}

	/// Checks whether the delay-task graph is strictly acyclic,
	/// without running any busy-period analysis. Used by the
	/// path-deletion companion tool, which builds VOQ-style schedules
	/// that cannot tolerate the cyclic jitter feedback `calc_delays`
	/// otherwise iterates to a fixed point. Reports the lowest-id
	/// offending task's VL and every one of its destinations as the
	/// remediation: dropping those paths is always enough to break
	/// the cycle through this VL.
	pub fn detect_cycle(&mut self, rng: Option<&mut StdRng>) -> Result<()>
	{
		task::build(self, rng);
		task::build_task_order(self);
		if let Some(&id) = self.cyclic_order.first()
		{
			let vl = self.tasks[id.0].vl;
			let dests: Vec<DeviceId> = self.vlink(vl).destinations.keys().copied().collect();
			return Err(EngineError::Cycle {
				vl,
				dests: dests.clone(),
				message: format!("VL {vl}'s delay-task graph has a dependency cycle; dropping its paths to {dests:?} breaks it"),
			});
		}
		Ok(())
	}
}
