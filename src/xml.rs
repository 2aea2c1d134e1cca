/*!
Reading and writing the `afdxxml` configuration format. The schema:

```xml
<afdxxml linkRate="12.5" scheme="cioq" fabrics="2" cellSize="10"
 bpMaxIter="100000" cyclicMaxIter="100">
 <devices>
 <device id="1" kind="end"/>
 <device id="2" kind="switch"/>
 </devices>
 <links>
 <link a="10" b="100" capacity="12.5"/>
 </links>
 <vlinks>
 <vl id="1" src="1" bag="8" smax="1518" smin="64" jit0="500">
 <path dest="3">
 <port id="10"/>
 <port id="201"/>
 </path>
 </vl>
 </vlinks>
</afdxxml>
```

`linkRate` is bytes/ms, `jit0` microseconds, matching the original's
`jitStartDefault`/`sminDefault` units. On write, each `vl` gains
`maxDelay`/`maxJit` attributes per destination once the engine has run.
*/

use std::fs;
use std::path::Path;

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::handles::{DeviceId, PortId, VlinkId};
use crate::topology::{DeviceKind, DeviceSpec, LinkSpec, Network, NetworkParams, Scheme, VlPathSpec, VlSpec};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename = "afdxxml")]
struct XmlRoot
{
	#[serde(rename = "@linkRate")]
	link_rate: f64,
	#[serde(rename = "@scheme", default = "default_scheme_name")]
	scheme: String,
	#[serde(rename = "@fabrics", default = "default_fabrics")]
	fabrics: u32,
	#[serde(rename = "@bpMaxIter", default = "default_bp_max_iter")]
	bp_max_iter: u64,
	#[serde(rename = "@cyclicMaxIter", default = "default_cyclic_max_iter")]
	cyclic_max_iter: u64,
	devices: XmlDevices,
	links: XmlLinks,
	vlinks: XmlVlinks,
}

fn default_scheme_name() -> String
{
	"cioq".to_string()
}
fn default_fabrics() -> u32
{
	8
}
fn default_bp_max_iter() -> u64
{
	100_000
}
fn default_cyclic_max_iter() -> u64
{
	100
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlDevices
{
	#[serde(rename = "device", default)]
	device: Vec<XmlDevice>,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlDevice
{
	#[serde(rename = "@id")]
	id: i32,
	#[serde(rename = "@kind")]
	kind: String,
	#[serde(rename = "@ports", default)]
	ports: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlLinks
{
	#[serde(rename = "link", default)]
	link: Vec<XmlLink>,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlLink
{
	#[serde(rename = "@a")]
	a: i32,
	#[serde(rename = "@b")]
	b: i32,
	#[serde(rename = "@capacity")]
	capacity: f64,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlVlinks
{
	#[serde(rename = "vl", default)]
	vl: Vec<XmlVl>,
}

fn default_smin() -> i64
{
	64
}
fn default_jit0() -> f64
{
	500.0
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlVl
{
	#[serde(rename = "@id")]
	id: i32,
	#[serde(rename = "@src")]
	src: i32,
	#[serde(rename = "@bag")]
	bag: f64,
	#[serde(rename = "@smax")]
	smax: i64,
	#[serde(rename = "@smin", default = "default_smin")]
	smin: i64,
	#[serde(rename = "@jit0", default = "default_jit0")]
	jit0: f64,
	#[serde(rename = "path", default)]
	path: Vec<XmlPath>,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlPath
{
	#[serde(rename = "@dest")]
	dest: i32,
	#[serde(rename = "port", default)]
	port: Vec<XmlPort>,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlPort
{
	#[serde(rename = "@id")]
	id: i32,
}

/// The parsed content of an `afdxxml` document before it is handed to
/// [`Network::build`]: kept around (rather than discarded once a
/// [`Network`] exists) so the path-deletion companion tool can mutate a
/// VL's paths and re-serialise without re-parsing.
#[derive(Clone, Debug)]
pub struct NetworkSpec
{
	pub params: NetworkParams,
	pub devices: Vec<DeviceSpec>,
	pub links: Vec<LinkSpec>,
	pub vlinks: Vec<VlSpec>,
}

/// Parses an `afdxxml` document's text into its spec form, without building a [`Network`] yet.
pub fn read_spec_str(xml: &str) -> Result<NetworkSpec>
{
	let root: XmlRoot = from_str(xml).map_err(|e| EngineError::Io(format!("malformed afdxxml document: {e}")))?;

	let scheme = match root.scheme.as_str()
	{
		"oq" => Scheme::Oq,
		"cioq" =>
		{
			if root.fabrics % 2 != 0
			{
				return Err(EngineError::Io(format!("fabrics must be a multiple of 2, got {}", root.fabrics)));
			}
			Scheme::Cioq { n_fabrics: root.fabrics }
		}
		other => return Err(EngineError::Io(format!("unknown scheme '{other}', expected 'oq' or 'cioq'"))),
	};

	let devices = root
		.devices
		.device
		.into_iter()
		.map(|d| {
			let kind = match d.kind.as_str()
			{
				"end" => DeviceKind::End,
				"switch" => DeviceKind::Switch,
				other => return Err(EngineError::Io(format!("device {} has unknown kind '{other}'", d.id))),
			};
			let ports = d
				.ports
				.split(',')
				.filter(|s| !s.trim().is_empty())
				.map(|s| s.trim().parse::<i32>().map(PortId).map_err(|_| EngineError::Io(format!("device {} has a non-numeric port id '{s}'", d.id))))
				.collect::<Result<Vec<_>>>()?;
			Ok(DeviceSpec { id: DeviceId(d.id), kind, ports })
		})
		.collect::<Result<Vec<_>>>()?;

	let links = root.links.link.into_iter().map(|l| LinkSpec { a: PortId(l.a), b: PortId(l.b), capacity: l.capacity }).collect();

	let vlinks = root
		.vlinks
		.vl
		.into_iter()
		.map(|v| VlSpec {
			id: VlinkId(v.id),
			src: DeviceId(v.src),
			bag_ms: v.bag,
			smax: v.smax,
			smin: v.smin,
			jit0_us: v.jit0,
			paths: v.path.into_iter().map(|p| VlPathSpec { dest: DeviceId(p.dest), ports: p.port.into_iter().map(|port| PortId(port.id)).collect() }).collect(),
		})
		.collect();

	let params = NetworkParams { link_rate: root.link_rate, scheme, bp_max_iter: root.bp_max_iter, cyclic_max_iter: root.cyclic_max_iter };
	Ok(NetworkSpec { params, devices, links, vlinks })
}

/// Parses an `afdxxml` file into its spec form.
pub fn read_spec_file(path: &Path) -> Result<NetworkSpec>
{
	let text = fs::read_to_string(path).map_err(|e| EngineError::Io(format!("cannot read {}: {e}", path.display())))?;
	read_spec_str(&text)
}

/// Parses an `afdxxml` document's text into a ready-to-analyse [`Network`].
pub fn read_str(xml: &str) -> Result<Network>
{
	let spec = read_spec_str(xml)?;
	Network::build(spec.params, spec.devices, spec.links, spec.vlinks)
}

/// Parses an `afdxxml` file into a ready-to-analyse [`Network`].
pub fn read_file(path: &Path) -> Result<Network>
{
	let spec = read_spec_file(path)?;
	Network::build(spec.params, spec.devices, spec.links, spec.vlinks)
}

fn scheme_name(scheme: Scheme) -> (&'static str, u32)
{
	match scheme
	{
		Scheme::Oq => ("oq", 1),
		Scheme::Cioq { n_fabrics } => ("cioq", n_fabrics),
	}
}

/// Serialises a (possibly mutated) [`NetworkSpec`] back into an
/// `afdxxml` document, the counterpart `toXml` needs for the
/// path-deletion companion tool, which reads and rewrites the same
/// schema rather than emitting `<results>`.
pub fn write_spec_str(spec: &NetworkSpec) -> Result<String>
{
	let (scheme, fabrics) = scheme_name(spec.params.scheme);
	let root = XmlRoot {
		link_rate: spec.params.link_rate,
		scheme: scheme.to_string(),
		fabrics,
		bp_max_iter: spec.params.bp_max_iter,
		cyclic_max_iter: spec.params.cyclic_max_iter,
		devices: XmlDevices {
			device: spec
				.devices
				.iter()
				.map(|d| XmlDevice {
					id: d.id.0,
					kind: if d.kind == DeviceKind::End { "end" } else { "switch" }.to_string(),
					ports: d.ports.iter().map(|p| p.0.to_string()).collect::<Vec<_>>().join(","),
				})
				.collect(),
		},
		links: XmlLinks { link: spec.links.iter().map(|l| XmlLink { a: l.a.0, b: l.b.0, capacity: l.capacity }).collect() },
		vlinks: XmlVlinks {
			vl: spec
				.vlinks
				.iter()
				.map(|v| XmlVl {
					id: v.id.0,
					src: v.src.0,
					bag: v.bag_ms,
					smax: v.smax,
					smin: v.smin,
					jit0: v.jit0_us,
					path: v.paths.iter().map(|p| XmlPath { dest: p.dest.0, port: p.ports.iter().map(|port| XmlPort { id: port.0 }).collect() }).collect(),
				})
				.collect(),
		},
	};
	to_string(&root).map_err(|e| EngineError::Io(format!("failed to serialise network: {e}")))
}

pub fn write_spec_file(path: &Path, spec: &NetworkSpec) -> Result<()>
{
	let text = write_spec_str(spec)?;
	fs::write(path, text).map_err(|e| EngineError::Io(format!("cannot write {}: {e}", path.display())))
}

#[derive(Debug, Serialize)]
#[serde(rename = "results")]
pub struct XmlResults
{
	#[serde(rename = "vl", default)]
	pub vl: Vec<XmlResultVl>,
}

#[derive(Debug, Serialize)]
pub struct XmlResultVl
{
	#[serde(rename = "@id")]
	pub id: i32,
	#[serde(rename = "dest", default)]
	pub dest: Vec<XmlResultDest>,
}

#[derive(Debug, Serialize)]
pub struct XmlResultDest
{
	#[serde(rename = "@device")]
	pub device: i32,
	#[serde(rename = "@maxDelay")]
	pub max_delay: i64,
	#[serde(rename = "@maxJit")]
	pub max_jit: i64,
}

/// Serialises every VL's computed end-to-end delay/jitter at every
/// destination, matching `configio.cpp::toXml`'s `maxDelay`/`maxJit` output attributes.
pub fn write_results_str(net: &Network) -> Result<String>
{
	let mut out = XmlResults { vl: Vec::new() };
	for id in net.vlink_ids()
	{
		let vl = net.vlink(id);
		let mut dest = Vec::new();
		for &device in vl.destinations.keys()
		{
			if let Some(d) = net.e2e(id, device)
			{
				dest.push(XmlResultDest { device: device.0, max_delay: d.dmax(), max_jit: d.jit() });
			}
		}
		out.vl.push(XmlResultVl { id: id.0, dest });
	}
	to_string(&out).map_err(|e| EngineError::Io(format!("failed to serialise results: {e}")))
}

pub fn write_results_file(path: &Path, net: &Network) -> Result<()>
{
	let text = write_results_str(net)?;
	fs::write(path, text).map_err(|e| EngineError::Io(format!("cannot write {}: {e}", path.display())))
}
