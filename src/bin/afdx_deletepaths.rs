/*!
`afdx-deletepaths` — repeatedly detects dependency cycles in the
delay-task graph and drops the offending virtual link's paths to the
cyclic destinations, until what remains is acyclic. The companion to
`afdx-delay`, grounded on `delaytool/source/deletepaths.cpp`.
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use afdx_delay::error::EngineError;
use afdx_delay::topology::Network;
use afdx_delay::xml;

#[derive(Parser)]
#[command(name = "afdx-deletepaths", about = "Drop virtual-link paths until the delay-task dependency graph is acyclic")]
struct Cli
{
	/// Input `afdxxml` file with network resources and virtual links.
	input: PathBuf,

	/// Output `afdxxml` file with some VL paths deleted and without cycles.
	output: PathBuf,

	/// Vary graph traversal order between runs instead of using declaration order.
	#[arg(short, long)]
	random: bool,

	/// Seed for the traversal-order randomness (only used with `--random`).
	#[arg(short, long, default_value_t = 0)]
	seed: u64,
}

fn main() -> Result<()>
{
	env_logger::init();
	let cli = Cli::parse();

	let mut spec = xml::read_spec_file(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
	let mut rng = cli.random.then(|| StdRng::seed_from_u64(cli.seed));

	loop
	{
		let mut network = Network::build(spec.params, spec.devices.clone(), spec.links.clone(), spec.vlinks.clone()).context("building network topology")?;

		match network.detect_cycle(rng.as_mut())
		{
			Ok(()) => break,
			Err(EngineError::Cycle { vl, dests, message }) =>
			{
				log::info!("{message}");
				if let Some(v) = spec.vlinks.iter_mut().find(|v| v.id == vl)
				{
					v.paths.retain(|p| !dests.contains(&p.dest));
				}
				spec.vlinks.retain(|v| !v.paths.is_empty());
			}
			Err(other) => return Err(other.into()),
		}
	}

	xml::write_spec_file(&cli.output, &spec).with_context(|| format!("writing {}", cli.output.display()))?;
	Ok(())
}
