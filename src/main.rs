//! sbgen is a command line tool generating 8-bit bijective S-boxes with
//! target cryptographic properties via hill climbing, simulated annealing
//! or a genetic algorithm.

#[macro_use]
extern crate lazy_static;

mod options;

use std::fs::File;
use std::io::{self, Write};
use std::process;
use std::time::Instant;

use itertools::Itertools;
use structopt::StructOpt;

use crate::options::{CostType, Method, SbgenOptions};
use sbgen::{
    algebraic_immunity, delta_uniformity, erase_fixed_points, genetic, has_fixed_points,
    hill_climbing, nonlinearity, simulated_annealing, AnnealingParams, CostFunction, CostValue,
    CrossoverMethod, GeneticParams, HillClimbingParams, PropertyTargets, Sbox, SelectionMethod,
};

// The default number of worker threads is fixed at startup
lazy_static! {
    static ref THREADS: u32 = num_cpus::get() as u32;
}

fn main() {
    let options = SbgenOptions::from_args();

    if let Err(message) = run(&options) {
        eprintln!("sbgen: {}", message);
        process::exit(1);
    }
}

fn run(options: &SbgenOptions) -> Result<(), String> {
    match options.cost_type {
        CostType::Double => generate::<f64>(options),
        CostType::Int64 => generate::<i64>(options),
    }
}

fn generate<T: CostValue>(options: &SbgenOptions) -> Result<(), String> {
    let cost = CostFunction::parse(options.cost_function, &options.cost_function_params)?;
    let targets = PropertyTargets {
        nonlinearity: options.nonlinearity,
        delta_uniformity: options.delta_uniformity,
        algebraic_immunity: options.algebraic_immunity,
        seed: options.seed,
    };

    let mut output: Box<dyn Write> = match &options.to_file {
        Some(path) => Box::new(
            File::create(path).map_err(|e| format!("could not create `{}`: {}", path, e))?,
        ),
        None => Box::new(io::stdout()),
    };

    for _ in 0..options.sbox_count {
        let start = Instant::now();

        let result = match options.method {
            Method::HillClimbing => hill_climbing::<T>(&hill_climbing_params(options, targets, cost)),
            Method::SimulatedAnnealing => {
                simulated_annealing::<T>(&annealing_params(options, targets, cost)?)
            }
            Method::Genetic => genetic::<T>(&genetic_params(options, targets, cost)?),
        };

        let sbox = result
            .map_err(|e| e.to_string())?
            .ok_or_else(|| String::from("target S-box not found"))?;

        if options.visibility {
            println!("Search finished. [{:?}]", start.elapsed());
        }

        let sbox = if options.erase_points {
            erase_fixed_points(&sbox, options.seed.unwrap_or_else(rand::random))
        } else {
            sbox
        };

        write_report(&mut output, &sbox).map_err(|e| format!("could not write result: {}", e))?;
    }

    Ok(())
}

fn hill_climbing_params(
    options: &SbgenOptions,
    targets: PropertyTargets,
    cost: CostFunction,
) -> HillClimbingParams {
    let mut params = HillClimbingParams::new(targets, cost);
    params.thread_count = options.thread_count.unwrap_or(*THREADS);
    params.try_per_thread = options.try_per_thread;
    params.max_frozen_count = options.max_frozen_loops;
    params.verbose = options.visibility;
    params
}

fn annealing_params(
    options: &SbgenOptions,
    targets: PropertyTargets,
    cost: CostFunction,
) -> Result<AnnealingParams, String> {
    let raw = options.method_params.as_deref().unwrap_or("10,10000,1000,0.99");
    let parts = split_params(raw);
    if parts.len() != 4 {
        return Err(format!(
            "simulated_annealing takes 4 method parameters (max_outer_loops, max_inner_loops, \
             initial_temperature, alpha), got {}",
            parts.len()
        ));
    }

    let mut params = AnnealingParams::new(targets, cost);
    params.thread_count = options.thread_count.unwrap_or(*THREADS);
    params.max_outer_loops = parse_value(parts[0], "max_outer_loops")?;
    params.max_inner_loops = parse_value(parts[1], "max_inner_loops")?;
    params.initial_temperature = parse_value(parts[2], "initial_temperature")?;
    params.alpha = parse_value(parts[3], "alpha")?;
    params.max_frozen_outer_loops = options.max_frozen_loops;
    params.verbose = options.visibility;
    Ok(params)
}

fn genetic_params(
    options: &SbgenOptions,
    targets: PropertyTargets,
    cost: CostFunction,
) -> Result<GeneticParams, String> {
    let raw = options
        .method_params
        .as_deref()
        .unwrap_or("10,10,15000,100,0,0,basic,none");
    let parts = split_params(raw);
    if parts.len() != 8 {
        return Err(format!(
            "genetic takes 8 method parameters (mutants_per_parent, selection_count, \
             iterations_count, initial_population_count, crossover_count, child_per_parent, \
             selection, crossover), got {}",
            parts.len()
        ));
    }

    let mut params = GeneticParams::new(targets, cost);
    params.thread_count = options.thread_count.unwrap_or(*THREADS);
    params.mutants_per_parent = parse_value(parts[0], "mutants_per_parent")?;
    params.selection_count = parse_value(parts[1], "selection_count")?;
    params.iterations_count = parse_value(parts[2], "iterations_count")?;
    params.initial_population_count = parse_value(parts[3], "initial_population_count")?;
    params.crossover_count = parse_value(parts[4], "crossover_count")?;
    params.child_per_parent = parse_value(parts[5], "child_per_parent")?;
    params.selection = match parts[6] {
        "basic" => SelectionMethod::Basic,
        "rank" => SelectionMethod::RankSequential,
        "roulette" => SelectionMethod::RouletteWheelSequential,
        other => return Err(format!("unknown selection `{}`", other)),
    };
    params.crossover = match parts[7] {
        "none" => None,
        "cycle" => Some(CrossoverMethod::Cycle),
        "pmx" => Some(CrossoverMethod::Pmx),
        other => return Err(format!("unknown crossover `{}`", other)),
    };
    params.verbose = options.visibility;
    Ok(params)
}

/// Splits a comma-separated parameter list; surrounding braces and
/// whitespace are tolerated.
fn split_params(raw: &str) -> Vec<&str> {
    raw.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_value<V: std::str::FromStr>(part: &str, name: &str) -> Result<V, String> {
    part.parse()
        .map_err(|_| format!("could not parse method parameter `{}` from `{}`", name, part))
}

/// Prints the S-box as a 16x16 hexadecimal grid followed by its measured
/// properties.
fn write_report<W: Write>(output: &mut W, sbox: &Sbox) -> io::Result<()> {
    writeln!(output, "target sbox:")?;
    for row in sbox.chunks(16) {
        writeln!(
            output,
            "{}",
            row.iter()
                .format_with(", ", |byte, f| f(&format_args!("0x{:02X}", byte)))
        )?;
    }

    writeln!(output, "NL={}", nonlinearity(sbox))?;
    writeln!(output, "DU={}", delta_uniformity(sbox))?;
    writeln!(output, "AI={}", algebraic_immunity(sbox))?;
    writeln!(output, "Fixed Points={}", has_fixed_points(sbox) as u8)?;
    Ok(())
}
