//! ecotick - run an ecosystem scenario headless
//!
//! Loads a scenario file, runs it for the configured number of ticks and
//! prints a per-species summary. `--output` also writes the full run as JSON.

use std::path::PathBuf;

use clap::Parser;
use ecotick::core::error::Result;
use ecotick::scenario::Scenario;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ecotick")]
#[command(about = "Deterministic discrete-tick ecosystem simulation")]
struct Args {
    /// Scenario TOML file
    #[arg(long, default_value = "scenarios/kelp_forest.toml")]
    scenario: PathBuf,

    /// Ticks to run (overrides the scenario header)
    #[arg(long)]
    ticks: Option<u64>,

    /// Random seed (overrides the scenario header)
    #[arg(long)]
    seed: Option<u64>,

    /// Force qualitative thresholds on
    #[arg(long)]
    qualitative: bool,

    /// Write the full run output as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the effective scenario as TOML instead of running it
    #[arg(long)]
    export: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecotick=info")),
        )
        .init();

    let args = Args::parse();

    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(seed) = args.seed {
        scenario.header.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        scenario.header.ticks = ticks;
    }
    if args.qualitative {
        scenario.header.qualitative = true;
    }

    if args.export {
        print!("{}", scenario.export()?);
        return Ok(());
    }

    let mut world = scenario.build_world()?;
    let output = world.run(scenario.header.ticks);

    println!("{}", scenario.header.name);
    println!("{}", "=".repeat(scenario.header.name.len().max(8)));
    println!(
        "{} ticks ({:.1} days simulated), seed {}",
        output.statistics.ticks_simulated,
        output.statistics.ticks_simulated as f32 * scenario.header.tick_duration,
        output.seed
    );
    println!();
    for species in &output.final_snapshot.species {
        println!(
            "{:<6} population {:>6}  total mass {:>10.1}",
            species.code.as_str(),
            species.population,
            species.total_mass
        );
    }
    for resource in &output.final_snapshot.resources {
        println!("{:<6} level {:>10.1}", resource.code.as_str(), resource.level);
    }
    println!();
    let deaths = &output.statistics.deaths;
    println!(
        "Deaths: {} old age, {} underweight, {} resource starvation, {} property starvation, {} eaten",
        deaths.old_age,
        deaths.underweight,
        deaths.resource_starvation,
        deaths.property_starvation,
        deaths.consumed
    );
    println!("{}", output.summary());

    if let Some(path) = args.output {
        std::fs::write(&path, output.to_json()?)?;
        println!("Full output written to {}", path.display());
    }

    Ok(())
}
