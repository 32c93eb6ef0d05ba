use std::str::FromStr;

use structopt::StructOpt;

use sbgen::CostFunctionKind;

/// Search method selector as it appears on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    HillClimbing,
    SimulatedAnnealing,
    Genetic,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hill_climbing" => Ok(Method::HillClimbing),
            "simulated_annealing" => Ok(Method::SimulatedAnnealing),
            "genetic" => Ok(Method::Genetic),
            _ => Err(String::from("Unknown method.")),
        }
    }
}

/// Numeric domain costs are accumulated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostType {
    Double,
    Int64,
}

impl FromStr for CostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "double" => Ok(CostType::Double),
            "int64_t" => Ok(CostType::Int64),
            _ => Err(String::from("Unknown cost type. Possible values: double, int64_t.")),
        }
    }
}

#[derive(Clone, StructOpt)]
#[structopt(
    name = "sbgen",
    about = "Search for bijective 8-bit S-boxes with target cryptographic properties."
)]
pub struct SbgenOptions {
    /**
    Search method. Current available methods are:
    hill_climbing, simulated_annealing, genetic
    */
    #[structopt(long = "method")]
    pub method: Method,

    /**
    Target nonlinearity (lower bound). Mandatory.
    */
    #[structopt(long = "nonlinearity")]
    pub nonlinearity: i32,

    /**
    Target delta uniformity (upper bound).
    */
    #[structopt(long = "delta_uniformity")]
    pub delta_uniformity: Option<i32>,

    /**
    Target algebraic immunity (lower bound).
    */
    #[structopt(long = "algebraic_immunity")]
    pub algebraic_immunity: Option<i32>,

    /**
    Fixed random seed. Without it every run draws fresh entropy.
    */
    #[structopt(long = "seed")]
    pub seed: Option<u64>,

    /**
    Cost function guiding the search. Current available functions are:
    whs, max_whs, wcf, pcf, cf1, cf2
    */
    #[structopt(long = "cost_function", default_value = "whs")]
    pub cost_function: CostFunctionKind,

    /**
    Comma-separated cost function parameters: whs/max_whs take two (r, x),
    pcf takes one (n), cf1/cf2 take three (r, x, y), wcf takes none.
    */
    #[structopt(long = "cost_function_params", default_value = "12,0")]
    pub cost_function_params: String,

    /**
    Numeric domain the cost is accumulated in: double or int64_t.
    */
    #[structopt(long = "cost_type", default_value = "double")]
    pub cost_type: CostType,

    /**
    Comma-separated method parameters, read in declared order.
    simulated_annealing: max_outer_loops, max_inner_loops,
    initial_temperature, alpha (default "10,10000,1000,0.99").
    genetic: mutants_per_parent, selection_count, iterations_count,
    initial_population_count, crossover_count, child_per_parent,
    selection (basic|rank|roulette), crossover (none|cycle|pmx)
    (default "10,10,15000,100,0,0,basic,none").
    hill_climbing takes no method parameters.
    */
    #[structopt(long = "method_params")]
    pub method_params: Option<String>,

    /**
    Number of worker threads. Defaults to the number of logical CPUs.
    */
    #[structopt(long = "thread_count")]
    pub thread_count: Option<u32>,

    /**
    Maximal iterations per thread (hill climbing).
    */
    #[structopt(long = "try_per_thread", default_value = "1000000")]
    pub try_per_thread: u64,

    /**
    Maximal number of consecutive non-improving steps before a search
    freezes.
    */
    #[structopt(long = "max_frozen_loops", default_value = "100000")]
    pub max_frozen_loops: u64,

    /**
    Number of S-boxes to generate.
    */
    #[structopt(long = "sbox_count", default_value = "1")]
    pub sbox_count: u32,

    /**
    Enable verbose search progress output.
    */
    #[structopt(long = "visibility")]
    pub visibility: bool,

    /**
    Erase fixed and inverse-fixed points from the generated S-box with a
    random affine transform.
    */
    #[structopt(long = "erase_points")]
    pub erase_points: bool,

    /**
    Write the generated S-boxes to a file instead of standard output.
    */
    #[structopt(long = "to_file")]
    pub to_file: Option<String>,
}
