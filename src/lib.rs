/*!
afdx-delay
=====

This crate computes worst-case end-to-end latency and jitter bounds for
virtual links (VLs) in an AFDX-style switched network, using Queueing
Response Time Analysis (QRTA) over a busy-period fixed point at every
switching element a VL crosses.

# Usage

This crate is `afdx-delay`. To use it as a library add it to your
project's `Cargo.toml`:

```toml
[dependencies]
afdx-delay = "0.1"
```

Most users instead want the `afdx-delay`/`afdx-deletepaths` binaries
this crate ships, which read an `afdxxml` configuration and write the
computed delays back out in the same format.

# Public Interface

[`topology::Network::build`] parses a [`topology::NetworkParams`] plus
device/link/VL specifications into a routed [`topology::Network`].
[`topology::Network::calc_delays`] (defined in the `engine` module) runs
the full analysis and leaves every VL's end-to-end [`delay::DelayData`]
reachable through [`topology::Network::e2e`].

```no_run
# fn main() -> afdx_delay::error::Result<()> {
let mut network = afdx_delay::xml::read_file(std::path::Path::new("net.afdxxml"))?;
network.calc_delays()?;
# Ok(())
# }
```

* `units` — integer arithmetic over arrival curves, expressed in link-bytes.
* `handles` — integer arena handles (`DeviceId`, `PortId`, `VlinkId`, `VnodeId`, `DelayTaskId`, `QrtaId`).
* `error` — the flat `EngineError` kind shared by every fallible operation.
* `delay` — `DelayData`, the `(dmin, jit)` pair that flows through the engine.
* `topology` — devices, ports, VL routing trees and the `Network` arena.
* `cioq` — the combined input/output queueing switch model.
* `qrta` — the busy-period/delay-function analysis at one scheduling element.
* `task` — the per-VL delay-computation task graph and its ordering.
* `engine` — orchestration of the acyclic prefix and cyclic fixed point.
* `stats` — descriptive statistics over per-port bandwidth usage.
* `xml` — reading and writing the `afdxxml` configuration/results format.
*/

pub mod units;
pub mod handles;
pub mod error;
pub mod delay;
pub mod topology;
pub mod cioq;
pub mod qrta;
pub mod task;
pub mod engine;
pub mod stats;
pub mod xml;
