/*!
Engine error kinds. A flat enum carrying a human-readable message
identifying the VL/switch/port at fault, built around a flat kind plus
an attached message rather than per-variant structured payloads.
*/

use std::fmt;

use crate::handles::{DeviceId, VlinkId};

/// Failure of the engine's topology build or delay computation. No
/// partial results are ever produced alongside an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError
{
	/// A path referenced a port id with no owning device.
	UnknownPort(String),
	/// Reading or writing an `afdxxml` document failed.
	Io(String),
	/// Two paths of the same VL listed the same destination device.
	DuplicateDestination(String),
	/// A link's capacity disagreed with the network-wide link rate.
	HeterogeneousRate(String),
	/// The contributors at a scheduling element oversubscribe the link;
	/// the busy-period fixed point has no finite solution.
	BpEndless(String),
	/// The busy-period fixed point did not converge within `bp_max_iter` iterations.
	BpTooLong(String),
	/// The cyclic delay-propagation pass did not converge within `cyclic_max_iter` iterations.
	CyclicTooLong(String),
	/// Used only by the path-deletion companion tool: the task graph has
	/// a dependency cycle that exceeds the configured chain length, and
	/// `vl`'s paths to `dests` are offered as a remediation.
	Cycle { vl: VlinkId, dests: Vec<DeviceId>, message: String },
}

impl fmt::Display for EngineError
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		match self
		{
			EngineError::UnknownPort(m) => write!(f, "unknown port: {m}"),
			EngineError::Io(m) => write!(f, "{m}"),
			EngineError::DuplicateDestination(m) => write!(f, "duplicate destination: {m}"),
			EngineError::HeterogeneousRate(m) => write!(f, "heterogeneous link rate: {m}"),
			EngineError::BpEndless(m) => write!(f, "busy period has no fixed point: {m}"),
			EngineError::BpTooLong(m) => write!(f, "busy period computation took too long: {m}"),
			EngineError::CyclicTooLong(m) => write!(f, "cyclic delay propagation took too long: {m}"),
			EngineError::Cycle { vl, dests, message } =>
				write!(f, "cycle involving VL {vl}, candidate destinations to drop {dests:?}: {message}"),
		}
	}
}

impl std::error::Error for EngineError {}

pub type Result<T> = std::result::Result<T, EngineError>;
