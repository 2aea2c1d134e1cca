/*!
The delay-computation task graph. One [`DelayTask`]
exists for every `(vl, out_pseudo_id, elem)` triple: a VL's contribution
to, and result from, one scheduling element (a switching fabric `F` or
an output port `P`) on its way to one outgoing direction. Tasks are
wired by `inputs`/`output_for`, keyed by the `(vl, next-hop port)`
branch that produced or consumes the `DelayData`, mirroring the
original's `std::map<std::pair<int,int>, DelayTask*>` dependency maps.
*/

use std::collections::{BTreeMap, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::cioq::CioqMap;
use crate::delay::DelayData;
use crate::handles::{Branch, DelayTaskId, DeviceId, ElemKind, PortId, QrtaId, VlinkId, VnodeId};
use crate::qrta::Qrta;
use crate::topology::{Network, Scheme};

#[derive(Clone, Debug)]
pub struct DelayTask
{
	pub id: DelayTaskId,
	pub elem: ElemKind,
	pub vl: VlinkId,
	pub out_pseudo: PortId,
	pub qrta: QrtaId,
	pub vnode: VnodeId,
	/// Upstream tasks whose output must be current before this task can run.
	pub inputs: Vec<(Branch, DelayTaskId)>,
	/// Downstream tasks that read this task's output (inverse of `inputs`).
	pub output_for: Vec<(Branch, DelayTaskId)>,
	pub output: Option<DelayData>,
}

/// A `(qrta, vl, data)` fact known before any task runs: the VL enters
/// the network, or re-enters after a hop with no modeled task (never
/// happens in practice but documents the seam), with this fixed
/// `DelayData` rather than one produced by another task.
pub struct Seed
{
	pub qrta: QrtaId,
	pub vl: VlinkId,
	pub data: DelayData,
}

/// Everything [`build`] produces besides the tasks stored on `Network` itself.
pub struct BuildOutput
{
	pub seeds: Vec<Seed>,
}

/// Builds every switch's QRTA elements and delay tasks from the already
/// routed [`Network`]. `rng`, when given, shuffles device and branch
/// traversal order — the path-deletion companion tool's `--random` flag,
/// grounded on `deletepaths.cpp`'s shuffled graph traversal, which
/// varies which VL a dependency cycle gets attributed to between runs.
pub fn build(net: &mut Network, mut rng: Option<&mut StdRng>) -> BuildOutput
{
	let mut device_ids = net.device_ids();
	if let Some(r) = rng.as_deref_mut()
	{
		device_ids.shuffle(r);
	}
	for device in &device_ids
	{
		if net.device(*device).is_switch()
		{
			build_device_qrtas(net, *device);
		}
	}

	let mut seeds = Vec::new();
	for device in &device_ids
	{
		if net.device(*device).is_switch()
		{
			build_device_tasks(net, *device, &mut seeds, rng.as_deref_mut());
		}
	}

	wire_output_for(net);
	BuildOutput { seeds }
}

fn build_device_qrtas(net: &mut Network, device: DeviceId)
{
	let out_pseudos = net.out_pseudo_ids(device);
	let scheme = net.scheme;

	if let Scheme::Cioq { n_fabrics } = scheme
	{
		let map = CioqMap::build(net, device, n_fabrics);
		let component_ids = map.component_ids();
		net.devices.get_mut(&device).unwrap().cioq = Some(map);
		for comp in component_ids
		{
			let id = QrtaId(net.qrtas.len());
			net.qrtas.push(Qrta::new(id, ElemKind::F));
			net.devices.get_mut(&device).unwrap().qrtas.insert((ElemKind::F, comp), id);
		}
	}

	for p in out_pseudos
	{
		let id = QrtaId(net.qrtas.len());
		net.qrtas.push(Qrta::new(id, ElemKind::P));
		net.devices.get_mut(&device).unwrap().qrtas.insert((ElemKind::P, p.0), id);
	}
}

/// The task producing the `DelayData` with which `vl` arrives at `v`
/// (the parent's `P`-task for the branch leading into `v`), or `None`
/// at the VL's source, where it arrives with a fixed jit0 seed instead.
pub fn entry_task(net: &Network, v: VnodeId) -> Option<DelayTaskId>
{
	let vnode = net.vnode(v);
	let parent = vnode.parent?;
	let in_port = vnode.in_port.expect("non-root vnode always has an ingress port");
	net.vnode(parent).delay_tasks.get(&(ElemKind::P, in_port)).copied()
}

/// The fixed `DelayData` a VL leaves its source with, before crossing any
/// switching element:
/// `dmin = smin`, `dmax = smax + jit0b`.
fn source_data(vl: &crate::topology::Vlink) -> DelayData
{
	DelayData::new(vl.id, vl.smin, vl.smax + vl.jit0b - vl.smin)
}

/// The `DelayData` with which `vl` arrives at `v`, whether or not a task produced it.
pub fn entry_data(net: &Network, v: VnodeId) -> DelayData
{
	let vnode = net.vnode(v);
	match entry_task(net, v)
	{
		Some(t) => net.tasks[t.0].output.expect("entry task seeded before use"),
		None => source_data(net.vlink(vnode.vlink)),
	}
}

fn build_device_tasks(net: &mut Network, device: DeviceId, seeds: &mut Vec<Seed>, rng: Option<&mut StdRng>)
{
	// Collect every branch (upstream vnode, out_pseudo) at this device first,
	// since building one task needs to see its siblings.
	let mut branches: Vec<(VnodeId, PortId)> = Vec::new();
	for port in net.device(device).ports.clone()
	{
		for &v in net.port(port).vnodes.clone().values()
		{
			for &child in net.vnode(v).children.clone().iter()
			{
				let out_pseudo = net.vnode(child).in_port.unwrap();
				branches.push((v, out_pseudo));
			}
		}
	}
	if let Some(r) = rng
	{
		branches.shuffle(r);
	}

	let scheme = net.scheme;

	// Group branches sharing an F-element: by independent component, not
	// by the (possibly many-to-one) physical fabric id, so two components
	// folded onto the same fabric never become mutual F-task inputs.
	let mut by_component: BTreeMap<i32, Vec<(VnodeId, PortId)>> = BTreeMap::new();
	let mut by_out: BTreeMap<i32, Vec<(VnodeId, PortId)>> = BTreeMap::new();
	for &(v, out_pseudo) in &branches
	{
		by_out.entry(out_pseudo.0).or_default().push((v, out_pseudo));
		if let Scheme::Cioq {.. } = scheme
		{
			let comp = net.device(device).cioq.as_ref().unwrap().component_of_out(out_pseudo);
			by_component.entry(comp).or_default().push((v, out_pseudo));
		}
	}

	let mut f_task_of: BTreeMap<(VnodeId, PortId), DelayTaskId> = BTreeMap::new();

	if let Scheme::Cioq {.. } = scheme
	{
		for group in by_component.values()
		{
			let comp = net.device(device).cioq.as_ref().unwrap().component_of_out(group[0].1);
			let qrta = net.device(device).qrtas[&(ElemKind::F, comp)];
			for &(v, out_pseudo) in group
			{
				let id = DelayTaskId(net.tasks.len());
				let mut inputs = Vec::new();
				for &(v2, out2) in group
				{
					if v2 == v && out2 == out_pseudo
					{
						continue;
					}
					match entry_task(net, v2)
					{
						Some(t) => inputs.push(((net.vnode(v2).vlink, out2), t)),
						None =>
						{
							let vl2 = net.vnode(v2).vlink;
							seeds.push(Seed { qrta, vl: vl2, data: source_data(net.vlink(vl2)) });
						}
					}
				}
				match entry_task(net, v)
				{
					Some(t) => inputs.push(((net.vnode(v).vlink, out_pseudo), t)),
					None =>
					{
						let vl = net.vnode(v).vlink;
						seeds.push(Seed { qrta, vl, data: source_data(net.vlink(vl)) });
					}
				}
				let vl = net.vnode(v).vlink;
				net.tasks.push(DelayTask { id, elem: ElemKind::F, vl, out_pseudo, qrta, vnode: v, inputs, output_for: Vec::new(), output: None });
				f_task_of.insert((v, out_pseudo), id);
				net.vnode_mut(v).delay_tasks.insert((ElemKind::F, out_pseudo), id);
			}
		}
	}

	for group in by_out.values()
	{
		let out_pseudo = group[0].1;
		let qrta = net.device(device).qrtas[&(ElemKind::P, out_pseudo.0)];
		for &(v, _) in group
		{
			let id = DelayTaskId(net.tasks.len());
			let mut inputs = Vec::new();
			for &(v2, out2) in group
			{
				let upstream = f_task_of.get(&(v2, out2)).copied().or_else(|| entry_task(net, v2));
				match upstream
				{
					Some(t) => inputs.push(((net.vnode(v2).vlink, out2), t)),
					None =>
					{
						let vl2 = net.vnode(v2).vlink;
						seeds.push(Seed { qrta, vl: vl2, data: source_data(net.vlink(vl2)) });
					}
				}
			}
			let vl = net.vnode(v).vlink;
			net.tasks.push(DelayTask { id, elem: ElemKind::P, vl, out_pseudo, qrta, vnode: v, inputs, output_for: Vec::new(), output: None });
			net.vnode_mut(v).delay_tasks.insert((ElemKind::P, out_pseudo), id);
		}
	}
}

fn wire_output_for(net: &mut Network)
{
	let edges: Vec<(DelayTaskId, Branch, DelayTaskId)> = net.tasks.iter().flat_map(|t| t.inputs.iter().map(move |&(b, up)| (up, b, t.id))).collect();
	for (up, branch, down) in edges
	{
		net.tasks[up.0].output_for.push((branch, down));
	}
}

/// Splits tasks into an acyclic prefix (strict topological order) and a
/// cyclic remainder ordered by BFS layer on `max_input_layer`, grounded
/// on `algo.cpp::buildTasksOrder`.
pub fn build_task_order(net: &mut Network)
{
	let n = net.tasks.len();
	let mut indegree: Vec<usize> = net.tasks.iter().map(|t| t.inputs.len()).collect();
	let mut placed = vec![false; n];
	let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
	let mut acyclic = Vec::new();

	while let Some(i) = queue.pop_front()
	{
		if placed[i]
		{
			continue;
		}
		placed[i] = true;
		acyclic.push(DelayTaskId(i));
		for &(_, down) in &net.tasks[i].output_for
		{
			indegree[down.0] -= 1;
			if indegree[down.0] == 0
			{
				queue.push_back(down.0);
			}
		}
	}

	// Cyclic remainder, layered by the largest already-assigned layer among its inputs.
	let mut layer: Vec<i64> = vec![-1; n];
	for &DelayTaskId(i) in &acyclic
	{
		layer[i] = 0;
	}
	let mut remaining: Vec<usize> = (0..n).filter(|&i| !placed[i]).collect();
	let mut cyclic = Vec::new();
	let mut current_layer = 1i64;
	while !remaining.is_empty()
	{
		let mut ready = Vec::new();
		let mut still = Vec::new();
		for i in remaining
		{
			let max_in = net.tasks[i].inputs.iter().map(|(_, up)| layer[up.0]).max().unwrap_or(-1);
			if max_in >= 0 && max_in < current_layer
			{
				ready.push(i);
			}
			else
			{
				still.push(i);
			}
		}
		if ready.is_empty()
		{
			// Genuine mutual cycle: flush the rest in id order, breaking the
			// tie arbitrarily; the cyclic fixed point in the engine iterates
			// to convergence regardless of this order.
			for i in still
			{
				layer[i] = current_layer;
				cyclic.push(DelayTaskId(i));
			}
			break;
		}
		for &i in &ready
		{
			layer[i] = current_layer;
			cyclic.push(DelayTaskId(i));
		}
		remaining = still;
		current_layer += 1;
	}

	net.acyclic_order = acyclic;
	net.cyclic_order = cyclic;
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::topology::{DeviceSpec, LinkSpec, NetworkParams, VlPathSpec, VlSpec};

	fn two_switches() -> Network
	{
		let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Oq, bp_max_iter: 10_000, cyclic_max_iter: 100 };
		let devices = vec![
			DeviceSpec { id: DeviceId(1), kind: crate::topology::DeviceKind::End, ports: vec![PortId(100)] },
			DeviceSpec { id: DeviceId(2), kind: crate::topology::DeviceKind::Switch, ports: vec![PortId(10), PortId(20)] },
			DeviceSpec { id: DeviceId(3), kind: crate::topology::DeviceKind::Switch, ports: vec![PortId(21), PortId(40)] },
			DeviceSpec { id: DeviceId(4), kind: crate::topology::DeviceKind::End, ports: vec![PortId(41)] },
		];
		let links = vec![
			LinkSpec { a: PortId(10), b: PortId(100), capacity: 1.0 },
			LinkSpec { a: PortId(20), b: PortId(21), capacity: 1.0 },
			LinkSpec { a: PortId(40), b: PortId(41), capacity: 1.0 },
		];
		let vlinks = vec![VlSpec {
			id: VlinkId(1),
			src: DeviceId(1),
			paths: vec![VlPathSpec { dest: DeviceId(4), ports: vec![PortId(10), PortId(21), PortId(41)] }],
			bag_ms: 8.0,
			smax: 4,
			smin: 4,
			jit0_us: 0.0,
		}];
		Network::build(params, devices, links, vlinks).unwrap()
	}

	#[test]
	fn build_produces_one_p_task_per_hop()
	{
		let mut net = two_switches();
		let out = build(&mut net, None);
		assert!(out.seeds.iter().any(|s| s.vl == VlinkId(1)));
		// one P-task at each of the two switches this VL crosses.
		assert_eq!(net.tasks.iter().filter(|t| t.elem == ElemKind::P).count(), 2);
	}

	#[test]
	fn task_order_is_a_valid_topological_sort()
	{
		let mut net = two_switches();
		build(&mut net, None);
		build_task_order(&mut net);
		assert!(net.cyclic_order.is_empty());
		assert_eq!(net.acyclic_order.len(), net.tasks.len());

		let position: BTreeMap<DelayTaskId, usize> = net.acyclic_order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
		for (i, &id) in net.acyclic_order.iter().enumerate()
		{
			for &(_, up) in &net.tasks[id.0].inputs
			{
				assert!(position[&up] < i, "task {id} ran before its input {up}");
			}
		}
	}
}
