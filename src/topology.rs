/*!
Topology model: devices, ports, the VL routing trees ([`Vnode`]) and the
[`Network`] that owns everything. Vnode/DelayTask cross-references are
handles into arenas owned by `Network`; `Device`/`Port`/`Vlink` stay
keyed maps because in the original those were already map lookups
rather than raw back-pointers.
*/

use std::collections::BTreeMap;

use crate::cioq::CioqMap;
use crate::delay::DelayData;
use crate::error::{EngineError, Result};
use crate::handles::{DelayTaskId, DeviceId, ElemKind, PortId, QrtaId, VlinkId, VnodeId};
use crate::qrta::Qrta;
use crate::task::DelayTask;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind
{
	End,
	Switch,
}

/// Which of the two supported switch scheduling models the network uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme
{
	/// Output-queued: no input-side contention.
	Oq,
	/// Combined input-and-output queueing with `n_fabrics` switching fabrics.
	Cioq { n_fabrics: u32 },
}

#[derive(Clone, Debug)]
pub struct Device
{
	pub id: DeviceId,
	pub kind: DeviceKind,
	/// Input ports owned by this device, in ascending id order.
	pub ports: Vec<PortId>,
	/// VLs for which this device is the source.
	pub source_for: Vec<VlinkId>,
	/// Present only for switches using [`Scheme::Cioq`].
	pub cioq: Option<CioqMap>,
	/// QRTA instance per (element kind, key): key is the independent
	/// component id for `F` elements, the output port's pseudo id for `P`.
	pub qrtas: BTreeMap<(ElemKind, i32), QrtaId>,
}

impl Device
{
	pub fn is_switch(&self) -> bool
	{
		matches!(self.kind, DeviceKind::Switch)
	}
}

/// An input port. Output ports are never materialised: they are
/// referenced by `peer_port`, the id of the input port on the other end
/// of the link.
#[derive(Clone, Debug)]
pub struct Port
{
	pub id: PortId,
	pub device: DeviceId,
	pub peer_port: PortId,
	pub peer_device: DeviceId,
	/// For every VL traversing this port, the [`Vnode`] that arrives through it.
	pub vnodes: BTreeMap<VlinkId, VnodeId>,
}

#[derive(Clone, Debug)]
pub struct Vlink
{
	pub id: VlinkId,
	pub src_device: DeviceId,
	/// BAG expressed in link-bytes.
	pub bag_b: i64,
	pub smax: i64,
	pub smin: i64,
	/// Source jitter bound expressed in link-bytes.
	pub jit0b: i64,
	pub src_vnode: VnodeId,
	/// Destination device id -> leaf Vnode.
	pub destinations: BTreeMap<DeviceId, VnodeId>,
}

/// A node of a VL's routing tree.
#[derive(Clone, Debug)]
pub struct Vnode
{
	pub vlink: VlinkId,
	pub device: DeviceId,
	/// The ingress port through which packets of this VL arrive at `device`; `None` at the source.
	pub in_port: Option<PortId>,
	pub parent: Option<VnodeId>,
	pub children: Vec<VnodeId>,
	/// Set only on destination leaves once the engine has run.
	pub e2e: Option<DelayData>,
	/// DelayTasks this vnode emits, keyed by (element kind, out pseudo port).
	pub delay_tasks: BTreeMap<(ElemKind, PortId), DelayTaskId>,
}

impl Vnode
{
	pub fn select_next(&self, net: &Network, in_port: PortId) -> Option<VnodeId>
	{
		self.children.iter().copied().find(|&c| net.vnode(c).in_port == Some(in_port))
	}
}

/// One resource link definition: `a` and `b` are the ids of the two
/// input ports it joins (a point-to-point full-duplex link).
#[derive(Clone, Debug)]
pub struct LinkSpec
{
	pub a: PortId,
	pub b: PortId,
	pub capacity: f64,
}

#[derive(Clone, Debug)]
pub struct DeviceSpec
{
	pub id: DeviceId,
	pub kind: DeviceKind,
	pub ports: Vec<PortId>,
}

/// One path of a VL: the ingress port ids visited from the source to `dest`.
#[derive(Clone, Debug)]
pub struct VlPathSpec
{
	pub dest: DeviceId,
	pub ports: Vec<PortId>,
}

#[derive(Clone, Debug)]
pub struct VlSpec
{
	pub id: VlinkId,
	pub src: DeviceId,
	pub paths: Vec<VlPathSpec>,
	pub bag_ms: f64,
	pub smax: i64,
	pub smin: i64,
	pub jit0_us: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct NetworkParams
{
	/// Link rate in bytes per millisecond.
	pub link_rate: f64,
	pub scheme: Scheme,
	pub bp_max_iter: u64,
	pub cyclic_max_iter: u64,
}

/// Owns every entity of the analysis: vlinks, devices, ports, vnodes,
/// CIOQ maps, QRTA instances and delay tasks. Cross-references outside
/// of owned fields are handles, never resolved until looked back up
/// through `Network`.
pub struct Network
{
	pub link_rate: f64,
	pub scheme: Scheme,
	pub bp_max_iter: u64,
	pub cyclic_max_iter: u64,

	pub devices: BTreeMap<DeviceId, Device>,
	pub ports: BTreeMap<PortId, Port>,
	pub vlinks: BTreeMap<VlinkId, Vlink>,
	pub vnodes: Vec<Vnode>,
	pub qrtas: Vec<Qrta>,
	pub tasks: Vec<DelayTask>,

	pub acyclic_order: Vec<DelayTaskId>,
	pub cyclic_order: Vec<DelayTaskId>,
}

impl Network
{
	pub fn build(params: NetworkParams, devices: Vec<DeviceSpec>, links: Vec<LinkSpec>, vlinks: Vec<VlSpec>) -> Result<Network>
	{
		for link in &links
		{
			if (link.capacity - params.link_rate).abs() > 1e-9
			{
				return Err(EngineError::HeterogeneousRate(format!(
					"link {}<->{} has capacity {} but the network rate is {}",
					link.a, link.b, link.capacity, params.link_rate
				)));
			}
		}

		let mut port_device: BTreeMap<PortId, DeviceId> = BTreeMap::new();
		for d in &devices
		{
			for &p in &d.ports
			{
				port_device.insert(p, d.id);
			}
		}

		let mut peer_of: BTreeMap<PortId, PortId> = BTreeMap::new();
		for link in &links
		{
			peer_of.insert(link.a, link.b);
			peer_of.insert(link.b, link.a);
		}

		let mut net = Network {
			link_rate: params.link_rate,
			scheme: params.scheme,
			bp_max_iter: params.bp_max_iter,
			cyclic_max_iter: params.cyclic_max_iter,
			devices: BTreeMap::new(),
			ports: BTreeMap::new(),
			vlinks: BTreeMap::new(),
			vnodes: Vec::new(),
			qrtas: Vec::new(),
			tasks: Vec::new(),
			acyclic_order: Vec::new(),
			cyclic_order: Vec::new(),
		};

		for d in &devices
		{
			net.devices.insert(
				d.id,
				Device { id: d.id, kind: d.kind, ports: d.ports.clone(), source_for: Vec::new(), cioq: None, qrtas: BTreeMap::new() },
			);
			for &p in &d.ports
			{
				let peer_port = *peer_of.get(&p).ok_or_else(|| EngineError::UnknownPort(format!("port {p} of device {} has no link", d.id)))?;
				let peer_device = *port_device
					.get(&peer_port)
					.ok_or_else(|| EngineError::UnknownPort(format!("port {peer_port} linked from port {p} has no owning device")))?;
				net.ports.insert(p, Port { id: p, device: d.id, peer_port, peer_device, vnodes: BTreeMap::new() });
			}
		}

		for spec in vlinks
		{
			net.add_vlink(spec)?;
		}

		Ok(net)
	}

	fn add_vlink(&mut self, spec: VlSpec) -> Result<()>
	{
		let bag_b = (spec.bag_ms * self.link_rate) as i64;
		let jit0b = (spec.jit0_us / 1000.0 * self.link_rate).ceil() as i64;

		let src_vnode = self.new_vnode(spec.id, spec.src, None, None);
		self.devices.get_mut(&spec.src).map(|d| d.source_for.push(spec.id));

		let mut destinations = BTreeMap::new();
		for path in &spec.paths
		{
			let mut cur = src_vnode;
			for &port_id in &path.ports
			{
				let device = *self
					.ports
					.get(&port_id)
					.map(|p| &p.device)
					.ok_or_else(|| EngineError::UnknownPort(format!("VL {} path references unknown port {port_id}", spec.id)))?;
				let existing = self.vnode(cur).select_next(self, port_id);
				cur = match existing
				{
					Some(child) => child,
					None =>
					{
						let child = self.new_vnode(spec.id, device, Some(port_id), Some(cur));
						self.vnode_mut(cur).children.push(child);
						self.ports.get_mut(&port_id).unwrap().vnodes.insert(spec.id, child);
						child
					}
				};
			}
			if destinations.insert(path.dest, cur).is_some()
			{
				return Err(EngineError::DuplicateDestination(format!("VL {} lists destination device {} more than once", spec.id, path.dest)));
			}
		}

		self.vlinks.insert(spec.id, Vlink { id: spec.id, src_device: spec.src, bag_b, smax: spec.smax, smin: spec.smin, jit0b, src_vnode, destinations });
		Ok(())
	}

	fn new_vnode(&mut self, vlink: VlinkId, device: DeviceId, in_port: Option<PortId>, parent: Option<VnodeId>) -> VnodeId
	{
		let id = VnodeId(self.vnodes.len());
		self.vnodes.push(Vnode { vlink, device, in_port, parent, children: Vec::new(), e2e: None, delay_tasks: BTreeMap::new() });
		id
	}

	pub fn vnode(&self, id: VnodeId) -> &Vnode
	{
		&self.vnodes[id.0]
	}

	pub fn vnode_mut(&mut self, id: VnodeId) -> &mut Vnode
	{
		&mut self.vnodes[id.0]
	}

	pub fn device(&self, id: DeviceId) -> &Device
	{
		&self.devices[&id]
	}

	pub fn port(&self, id: PortId) -> &Port
	{
		&self.ports[&id]
	}

	pub fn vlink(&self, id: VlinkId) -> &Vlink
	{
		&self.vlinks[&id]
	}

	pub fn device_ids(&self) -> Vec<DeviceId>
	{
		self.devices.keys().copied().collect()
	}

	pub fn vlink_ids(&self) -> Vec<VlinkId>
	{
		self.vlinks.keys().copied().collect()
	}

	/// Pseudo ids of every direction this device sends traffic into, i.e.
	/// the peer port id reachable from each of the device's own ports.
	pub fn out_pseudo_ids(&self, device: DeviceId) -> Vec<PortId>
	{
		let mut v: Vec<PortId> = self.device(device).ports.iter().map(|p| self.port(*p).peer_port).collect();
		v.sort();
		v
	}

	/// Does any VL entering `in_port` branch, within this switch, towards `out_pseudo`?
	pub fn has_vlinks(&self, in_port: PortId, out_pseudo: PortId) -> bool
	{
		self.port(in_port).vnodes.values().any(|&v| self.vnode(v).select_next(self, out_pseudo).is_some())
	}

	/// Vnodes entering `in_port` that branch towards `out_pseudo` within this switch.
	pub fn vlinks_through(&self, in_port: PortId, out_pseudo: PortId) -> Vec<VnodeId>
	{
		self.port(in_port)
			.vnodes
			.values()
			.copied()
			.filter(|&v| self.vnode(v).select_next(self, out_pseudo).is_some())
			.collect()
	}

	/// `Σ smax/bag` for every VL crossing each port — the bandwidth-usage
	/// descriptive-statistics plumbing (grounded on `configio.cpp::bwUsage`).
	pub fn bandwidth_usage(&self) -> BTreeMap<PortId, f64>
	{
		let mut res = BTreeMap::new();
		for (&id, port) in &self.ports
		{
			let sum: f64 = port.vnodes.keys().map(|vl| {
				let vl = self.vlink(*vl);
				vl.smax as f64 / vl.bag_b as f64
			}).sum();
			res.insert(id, sum);
		}
		res
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn two_es_one_switch() -> Network
	{
		let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Oq, bp_max_iter: 100_000, cyclic_max_iter: 100 };
		let devices = vec![
			DeviceSpec { id: DeviceId(1), kind: DeviceKind::End, ports: vec![PortId(100)] },
			DeviceSpec { id: DeviceId(2), kind: DeviceKind::Switch, ports: vec![PortId(10), PortId(20)] },
			DeviceSpec { id: DeviceId(3), kind: DeviceKind::End, ports: vec![PortId(30)] },
		];
		let links = vec![LinkSpec { a: PortId(10), b: PortId(100), capacity: 1.0 }, LinkSpec { a: PortId(20), b: PortId(30), capacity: 1.0 }];
		let vlinks = vec![VlSpec {
			id: VlinkId(1),
			src: DeviceId(1),
			paths: vec![VlPathSpec { dest: DeviceId(3), ports: vec![PortId(10), PortId(30)] }],
			bag_ms: 8.0,
			smax: 4,
			smin: 4,
			jit0_us: 0.0,
		}];
		Network::build(params, devices, links, vlinks).unwrap()
	}

	#[test]
	fn builds_and_routes()
	{
		let net = two_es_one_switch();
		let vl = net.vlink(VlinkId(1));
		assert!(vl.destinations.contains_key(&DeviceId(3)));
	}

	#[test]
	fn duplicate_destination_rejected()
	{
		let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Oq, bp_max_iter: 100, cyclic_max_iter: 100 };
		let devices = vec![
			DeviceSpec { id: DeviceId(1), kind: DeviceKind::End, ports: vec![] },
			DeviceSpec { id: DeviceId(2), kind: DeviceKind::End, ports: vec![PortId(10)] },
		];
		let links = vec![LinkSpec { a: PortId(10), b: PortId(10), capacity: 1.0 }];
		let vlinks = vec![VlSpec {
			id: VlinkId(1),
			src: DeviceId(1),
			paths: vec![
				VlPathSpec { dest: DeviceId(2), ports: vec![PortId(10)] },
				VlPathSpec { dest: DeviceId(2), ports: vec![PortId(10)] },
			],
			bag_ms: 8.0,
			smax: 4,
			smin: 4,
			jit0_us: 0.0,
		}];
		let err = Network::build(params, devices, links, vlinks).unwrap_err();
		assert!(matches!(err, EngineError::DuplicateDestination(_)));
	}
}
