/*!
`afdx-delay` — computes worst-case end-to-end latency and jitter for
every virtual link of an `afdxxml` network description, the equivalent
of `delaytool/source/main.cpp`.
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use afdx_delay::topology::Scheme;
use afdx_delay::{stats, xml};

#[derive(Parser)]
#[command(name = "afdx-delay", about = "Worst-case AFDX virtual-link delay and jitter analysis")]
struct Cli
{
	/// Input `afdxxml` file with network resources and virtual links.
	input: PathBuf,

	/// Output `afdxxml` file to write the computed delays to.
	output: PathBuf,

	/// Switch scheduling model: oq (output-queued) or cioq (combined input/output queueing).
	#[arg(short, long, value_parser = ["oq", "cioq"])]
	scheme: Option<String>,

	/// Number of physical switching fabrics, only meaningful with `--scheme cioq`. Must be a multiple of 2.
	#[arg(long, default_value_t = 8)]
	fabrics: u32,

	/// Iteration cap for a single element's busy-period fixed point.
	#[arg(long)]
	bp_max_iter: Option<u64>,

	/// Iteration cap for the cyclic jitter fixed point across the whole network.
	#[arg(long)]
	cyclic_max_iter: Option<u64>,

	/// Print `network.bandwidth_usage()` descriptive statistics before analysing.
	#[arg(long)]
	stats: bool,
}

fn main() -> Result<()>
{
	env_logger::init();
	let cli = Cli::parse();

	let mut spec = xml::read_spec_file(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
	if let Some(scheme) = &cli.scheme
	{
		spec.params.scheme = match scheme.as_str()
		{
			"oq" => Scheme::Oq,
			"cioq" =>
			{
				anyhow::ensure!(cli.fabrics % 2 == 0, "--fabrics must be a multiple of 2, got {}", cli.fabrics);
				Scheme::Cioq { n_fabrics: cli.fabrics }
			}
			_ => unreachable!("clap validates scheme"),
		};
	}
	if let Some(n) = cli.bp_max_iter
	{
		spec.params.bp_max_iter = n;
	}
	if let Some(n) = cli.cyclic_max_iter
	{
		spec.params.cyclic_max_iter = n;
	}

	let mut network = afdx_delay::topology::Network::build(spec.params, spec.devices, spec.links, spec.vlinks).context("building network topology")?;

	if cli.stats
	{
		if let Some(summary) = stats::summary(&network)
		{
			log::info!("bandwidth usage: min={:.4} max={:.4} mean={:.4} variance={:.6}", summary.min, summary.max, summary.mean, summary.variance);
		}
	}

	network.calc_delays().context("calculating end-to-end delays")?;

	xml::write_results_file(&cli.output, &network).with_context(|| format!("writing {}", cli.output.display()))?;
	Ok(())
}
