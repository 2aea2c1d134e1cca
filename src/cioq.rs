/*!
CIOQ (Combined Input-Output Queueing) switch model. A
switch's input ports and outgoing directions form a bipartite traffic
graph — an edge between an input port and an outgoing direction exists
iff some VL actually branches that way. The connected components of
that graph ("independent components") never contend with each other
for the switching fabric, so each gets its own `F`-element QRTA;
`n_fabrics` then folds components onto a smaller number of physical
fabrics by round-robin, grounded on `algo.cpp`'s `generateTableBasic`/
`CioqMap::buildComp`/`setMap`.
*/

use std::collections::{BTreeMap, VecDeque};

use crate::handles::{DeviceId, PortId};
use crate::topology::Network;

/// One connected component of a device's bipartite input/output traffic graph.
#[derive(Clone, Debug)]
pub struct PortsSubgraph
{
	pub id: i32,
	pub in_ports: Vec<PortId>,
	pub out_pseudos: Vec<PortId>,
}

/// Per-switch assignment of input ports and outgoing directions to
/// fabrics. `queue_of`/`fabric_of` key by the *physical* fabric id
/// (after folding independent components onto `n_fabrics` fabrics) and
/// exist only for queue/diagnostic bookkeeping; `component_of_in`/
/// `component_of_out` give the true, unfolded independent-component id
/// that the F-element QRTA and F-task dependency graph must key on, so
/// that two components folded onto the same physical fabric never
/// appear as contributors of each other's busy period.
#[derive(Clone, Debug)]
pub struct CioqMap
{
	pub components: Vec<PortsSubgraph>,
	pub queue_of: BTreeMap<PortId, i32>,
	pub fabric_of: BTreeMap<PortId, i32>,
	component_of_in: BTreeMap<PortId, i32>,
	component_of_out: BTreeMap<PortId, i32>,
}

impl CioqMap
{
	pub fn queue_id(&self, in_port: PortId) -> i32
	{
		self.queue_of[&in_port]
	}

	pub fn fabric_id(&self, out_pseudo: PortId) -> i32
	{
		self.fabric_of[&out_pseudo]
	}

	/// The independent component id an input port belongs to, unfolded
	/// by `n_fabrics` — the key the F-element QRTA and F-task inputs use.
	pub fn component_of_in(&self, in_port: PortId) -> i32
	{
		self.component_of_in[&in_port]
	}

	/// The independent component id an outgoing direction belongs to,
	/// unfolded by `n_fabrics` — the key the F-element QRTA and F-task
	/// inputs use.
	pub fn component_of_out(&self, out_pseudo: PortId) -> i32
	{
		self.component_of_out[&out_pseudo]
	}

	/// Component ids present at this device, in ascending order.
	pub fn component_ids(&self) -> Vec<i32>
	{
		self.components.iter().map(|c| c.id).collect()
	}

	/// Physical fabric ids in use at this device, in ascending order.
	pub fn fabric_ids(&self) -> Vec<i32>
	{
		let mut ids: Vec<i32> = self.fabric_of.values().copied().collect();
		ids.sort();
		ids.dedup();
		ids
	}

	pub fn build(net: &Network, device: DeviceId, n_fabrics: u32) -> CioqMap
	{
		let dev = net.device(device);
		let ins = dev.ports.clone();
		let outs = net.out_pseudo_ids(device);

		// Node 0..ins.len() are input ports, ins.len().. are out pseudo ids.
		let n = ins.len() + outs.len();
		let mut parent: Vec<usize> = (0..n).collect();
		fn find(parent: &mut Vec<usize>, x: usize) -> usize
		{
			if parent[x] != x
			{
				parent[x] = find(parent, parent[x]);
			}
			parent[x]
		}
		fn union(parent: &mut Vec<usize>, a: usize, b: usize)
		{
			let ra = find(parent, a);
			let rb = find(parent, b);
			if ra != rb
			{
				parent[ra] = rb;
			}
		}

		for (i, &in_port) in ins.iter().enumerate()
		{
			for (j, &out_pseudo) in outs.iter().enumerate()
			{
				if net.has_vlinks(in_port, out_pseudo)
				{
					union(&mut parent, i, ins.len() + j);
				}
			}
		}

		// group by root, in BFS-discovery order for stable numbering.
		let mut root_to_comp: BTreeMap<usize, i32> = BTreeMap::new();
		let mut components: Vec<PortsSubgraph> = Vec::new();
		let mut seen_roots: VecDeque<usize> = VecDeque::new();
		for i in 0..n
		{
			let r = find(&mut parent, i);
			if !root_to_comp.contains_key(&r)
			{
				let id = components.len() as i32;
				root_to_comp.insert(r, id);
				components.push(PortsSubgraph { id, in_ports: Vec::new(), out_pseudos: Vec::new() });
				seen_roots.push_back(r);
			}
		}
		for (i, &in_port) in ins.iter().enumerate()
		{
			let r = find(&mut parent, i);
			let comp = root_to_comp[&r];
			components[comp as usize].in_ports.push(in_port);
		}
		for (j, &out_pseudo) in outs.iter().enumerate()
		{
			let r = find(&mut parent, ins.len() + j);
			let comp = root_to_comp[&r];
			components[comp as usize].out_pseudos.push(out_pseudo);
		}

		let n_fabrics = if n_fabrics == 0 { 1 } else { n_fabrics as i32 };
		let mut queue_of = BTreeMap::new();
		let mut fabric_of = BTreeMap::new();
		let mut component_of_in = BTreeMap::new();
		let mut component_of_out = BTreeMap::new();
		for comp in &components
		{
			let fabric = comp.id % n_fabrics;
			for &p in &comp.in_ports
			{
				queue_of.insert(p, fabric);
				component_of_in.insert(p, comp.id);
			}
			for &p in &comp.out_pseudos
			{
				fabric_of.insert(p, fabric);
				component_of_out.insert(p, comp.id);
			}
		}

		CioqMap { components, queue_of, fabric_of, component_of_in, component_of_out }
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::handles::VlinkId;
	use crate::topology::{DeviceKind, DeviceSpec, LinkSpec, NetworkParams, Scheme, VlPathSpec, VlSpec};

	#[test]
	fn disjoint_flows_form_separate_components()
	{
		// Two end-to-end flows through the same switch that never share an
		// input port or an outgoing direction: (10 -> 201) and (11 -> 200).
		let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Cioq { n_fabrics: 2 }, bp_max_iter: 100, cyclic_max_iter: 100 };
		let devices = vec![
			DeviceSpec { id: DeviceId(1), kind: DeviceKind::End, ports: vec![PortId(100)] },
			DeviceSpec { id: DeviceId(5), kind: DeviceKind::End, ports: vec![PortId(101)] },
			DeviceSpec { id: DeviceId(2), kind: DeviceKind::Switch, ports: vec![PortId(10), PortId(11), PortId(20), PortId(21)] },
			DeviceSpec { id: DeviceId(3), kind: DeviceKind::End, ports: vec![PortId(200)] },
			DeviceSpec { id: DeviceId(4), kind: DeviceKind::End, ports: vec![PortId(201)] },
		];
		let links = vec![
			LinkSpec { a: PortId(10), b: PortId(100), capacity: 1.0 },
			LinkSpec { a: PortId(11), b: PortId(101), capacity: 1.0 },
			LinkSpec { a: PortId(20), b: PortId(200), capacity: 1.0 },
			LinkSpec { a: PortId(21), b: PortId(201), capacity: 1.0 },
		];
		let vlinks: Vec<VlSpec> = vec![
			VlSpec { id: VlinkId(1), src: DeviceId(1), paths: vec![VlPathSpec { dest: DeviceId(4), ports: vec![PortId(10), PortId(201)] }], bag_ms: 8.0, smax: 4, smin: 4, jit0_us: 0.0 },
			VlSpec { id: VlinkId(2), src: DeviceId(5), paths: vec![VlPathSpec { dest: DeviceId(3), ports: vec![PortId(11), PortId(200)] }], bag_ms: 8.0, smax: 4, smin: 4, jit0_us: 0.0 },
		];
		let net = Network::build(params, devices, links, vlinks).unwrap();
		let map = CioqMap::build(&net, DeviceId(2), 2);
		let comp_of_in = |p: PortId| map.components.iter().position(|c| c.in_ports.contains(&p)).unwrap();
		assert_ne!(comp_of_in(PortId(10)), comp_of_in(PortId(11)));
	}
}
