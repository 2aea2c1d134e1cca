/*!
Descriptive statistics over per-port bandwidth usage: min, max, mean and
variance of `Σ smax/bag` across every port of the network, useful for a
quick sanity check of the input before running the full analysis.
*/

use crate::topology::Network;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary
{
	pub min: f64,
	pub max: f64,
	pub mean: f64,
	pub variance: f64,
}

/// Summarises `network.bandwidth_usage()`. Returns `None` for a network with no ports.
pub fn summary(network: &Network) -> Option<Summary>
{
	let usage = network.bandwidth_usage();
	let n = usage.len();
	if n == 0
	{
		return None;
	}
	let min = usage.values().cloned().fold(f64::INFINITY, f64::min);
	let max = usage.values().cloned().fold(f64::NEG_INFINITY, f64::max);
	let mean = usage.values().sum::<f64>() / n as f64;
	let variance = usage.values().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
	Some(Summary { min, max, mean, variance })
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::handles::{DeviceId, PortId, VlinkId};
	use crate::topology::{DeviceKind, DeviceSpec, LinkSpec, NetworkParams, Scheme, VlPathSpec, VlSpec};

	#[test]
	fn single_vl_single_port_usage()
	{
		let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Oq, bp_max_iter: 100, cyclic_max_iter: 100 };
		let devices = vec![
			DeviceSpec { id: DeviceId(1), kind: DeviceKind::End, ports: vec![PortId(100)] },
			DeviceSpec { id: DeviceId(2), kind: DeviceKind::End, ports: vec![PortId(101)] },
		];
		let links = vec![LinkSpec { a: PortId(100), b: PortId(101), capacity: 1.0 }];
		let vlinks = vec![VlSpec { id: VlinkId(1), src: DeviceId(1), paths: vec![VlPathSpec { dest: DeviceId(2), ports: vec![PortId(101)] }], bag_ms: 8.0, smax: 4, smin: 4, jit0_us: 0.0 }];
		let net = Network::build(params, devices, links, vlinks).unwrap();
		let s = summary(&net).unwrap();
		assert!((s.max - 0.5).abs() < 1e-9);
	}
}
