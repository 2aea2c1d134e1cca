//! Whole-network scenarios exercising the public API end to end, mirroring
//! the per-module unit tests but assembled the way a user of the crate
//! (or the `afdx-delay` binary) actually calls it.

use afdx_delay::error::EngineError;
use afdx_delay::handles::{DeviceId, PortId, VlinkId};
use afdx_delay::topology::{DeviceKind, DeviceSpec, LinkSpec, Network, NetworkParams, Scheme, VlPathSpec, VlSpec};
use afdx_delay::xml;

fn linear_network(scheme: Scheme) -> Network
{
	let params = NetworkParams { link_rate: 1.0, scheme, bp_max_iter: 10_000, cyclic_max_iter: 100 };
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
fn s1_two_end_systems_one_switch()
{
	let mut net = linear_network(Scheme::Oq);
	net.calc_delays().unwrap();
	let e2e = net.e2e(VlinkId(1), DeviceId(3)).unwrap();
	assert_eq!(e2e.dmin(), 4);
	assert_eq!(e2e.dmax(), 8);
	assert_eq!(e2e.jit(), 4);
}

#[test]
fn s2_multicast_vl_reaches_every_destination()
{
	let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Oq, bp_max_iter: 10_000, cyclic_max_iter: 100 };
	let devices = vec![
		DeviceSpec { id: DeviceId(1), kind: DeviceKind::End, ports: vec![PortId(100)] },
		DeviceSpec { id: DeviceId(2), kind: DeviceKind::Switch, ports: vec![PortId(10), PortId(20), PortId(21)] },
		DeviceSpec { id: DeviceId(3), kind: DeviceKind::End, ports: vec![PortId(30)] },
		DeviceSpec { id: DeviceId(4), kind: DeviceKind::End, ports: vec![PortId(31)] },
	];
	let links = vec![
		LinkSpec { a: PortId(10), b: PortId(100), capacity: 1.0 },
		LinkSpec { a: PortId(20), b: PortId(30), capacity: 1.0 },
		LinkSpec { a: PortId(21), b: PortId(31), capacity: 1.0 },
	];
	let vlinks = vec![VlSpec {
		id: VlinkId(1),
		src: DeviceId(1),
		paths: vec![
			VlPathSpec { dest: DeviceId(3), ports: vec![PortId(10), PortId(30)] },
			VlPathSpec { dest: DeviceId(4), ports: vec![PortId(10), PortId(31)] },
		],
		bag_ms: 8.0,
		smax: 4,
		smin: 4,
		jit0_us: 0.0,
	}];
	let mut net = Network::build(params, devices, links, vlinks).unwrap();
	net.calc_delays().unwrap();
	assert!(net.e2e(VlinkId(1), DeviceId(3)).is_some());
	assert!(net.e2e(VlinkId(1), DeviceId(4)).is_some());
}

#[test]
fn s3_overloaded_output_port_reports_bp_endless()
{
	let params = NetworkParams { link_rate: 1.0, scheme: Scheme::Oq, bp_max_iter: 10_000, cyclic_max_iter: 100 };
	let devices = vec![
		DeviceSpec { id: DeviceId(1), kind: DeviceKind::End, ports: vec![PortId(100)] },
		DeviceSpec { id: DeviceId(4), kind: DeviceKind::End, ports: vec![PortId(101)] },
		DeviceSpec { id: DeviceId(2), kind: DeviceKind::Switch, ports: vec![PortId(10), PortId(11), PortId(20)] },
		DeviceSpec { id: DeviceId(3), kind: DeviceKind::End, ports: vec![PortId(30)] },
	];
	let links = vec![
		LinkSpec { a: PortId(10), b: PortId(100), capacity: 1.0 },
		LinkSpec { a: PortId(11), b: PortId(101), capacity: 1.0 },
		LinkSpec { a: PortId(20), b: PortId(30), capacity: 1.0 },
	];
	let vlinks = vec![
		VlSpec { id: VlinkId(1), src: DeviceId(1), paths: vec![VlPathSpec { dest: DeviceId(3), ports: vec![PortId(10), PortId(30)] }], bag_ms: 1.0, smax: 1, smin: 1, jit0_us: 0.0 },
		VlSpec { id: VlinkId(2), src: DeviceId(4), paths: vec![VlPathSpec { dest: DeviceId(3), ports: vec![PortId(11), PortId(30)] }], bag_ms: 1.0, smax: 1, smin: 1, jit0_us: 0.0 },
	];
	let mut net = Network::build(params, devices, links, vlinks).unwrap();
	let err = net.calc_delays().unwrap_err();
	assert!(matches!(err, EngineError::BpEndless(_)));
}

#[test]
fn s4_cioq_scheme_builds_and_runs_without_error()
{
	let mut net = linear_network(Scheme::Cioq { n_fabrics: 2 });
	net.calc_delays().unwrap();
	assert!(net.e2e(VlinkId(1), DeviceId(3)).is_some());
}

#[test]
fn s5_bandwidth_usage_stats_match_single_vl()
{
	let net = linear_network(Scheme::Oq);
	let summary = afdx_delay::stats::summary(&net).unwrap();
	assert!((summary.max - 0.5).abs() < 1e-9);
	assert!((summary.min - 0.0).abs() < 1e-9);
}

#[test]
fn s6_afdxxml_round_trips_through_read_and_write()
{
	let xml_text = r#"<afdxxml linkRate="1" scheme="oq">
  <devices>
    <device id="1" kind="end" ports="100"/>
    <device id="2" kind="switch" ports="10,20"/>
    <device id="3" kind="end" ports="30"/>
  </devices>
  <links>
    <link a="10" b="100" capacity="1"/>
    <link a="20" b="30" capacity="1"/>
  </links>
  <vlinks>
    <vl id="1" src="1" bag="8" smax="4" smin="4" jit0="0">
      <path dest="3">
        <port id="10"/>
        <port id="30"/>
      </path>
    </vl>
  </vlinks>
</afdxxml>"#;

	let mut net = xml::read_str(xml_text).unwrap();
	net.calc_delays().unwrap();
	let results = xml::write_results_str(&net).unwrap();
	assert!(results.contains("maxDelay"));

	let spec = xml::read_spec_str(xml_text).unwrap();
	let rewritten = xml::write_spec_str(&spec).unwrap();
	let reread = xml::read_spec_str(&rewritten).unwrap();
	assert_eq!(reread.vlinks.len(), spec.vlinks.len());
}

#[test]
fn s7_acyclic_network_passes_cycle_detection()
{
	let mut net = linear_network(Scheme::Oq);
	assert!(net.detect_cycle(None).is_ok());
}
