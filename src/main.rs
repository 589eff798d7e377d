mod data_structures {
    pub mod hypergraph;
}

mod factor_types {
    pub mod factor_trait;
    pub mod factor_type;
    pub mod function_table;
    pub mod potts;
}

mod cfn {
    pub mod cost_function_network;
    pub mod graphical_model;
    pub mod uai;
}

mod submodel {
    pub mod builder;
    pub mod classifier;
    pub mod optimizer;
    pub mod selection;
    pub mod sub_model;
    pub mod view_functions;
}

mod alg {
    pub mod astar;
    pub mod block_icm;
    pub mod branch_and_bound;
    pub mod dynamic_programming;
    pub mod solver;
}

use std::{env, fs, io, time::Instant};

use alg::{
    block_icm::{BlockIcm, BlockIcmOptions},
    solver::SolverKind,
};
use cfn::{cost_function_network::CostFunctionNetwork, uai::UAI};
use log::info;

// Usage: submodel-rust [INSTANCE_DIR] [bnb|astar|dp]
fn main() -> io::Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info"); // change "info" to "debug" for debug-level logging, etc.
    }
    env_logger::init();

    let mut args = env::args().skip(1);
    let instance_dir = args.next().unwrap_or_else(|| "test_instances/".to_string());
    let solver = match args.next() {
        Some(name) => name
            .parse::<SolverKind>()
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?,
        None => SolverKind::AStar,
    };
    let mut options = BlockIcmOptions::default();
    options.set_solver(solver);

    let mut test_instance_files = fs::read_dir(&instance_dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()?;
    test_instance_files.sort();

    for input_file in test_instance_files {
        if !input_file.is_file() {
            continue;
        }
        let filename = input_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lg = filename.ends_with(".LG") || filename.ends_with(".lg");

        info!("Processing instance {} with solver {}.", filename, solver);

        let time_start = Instant::now();
        let cfn = CostFunctionNetwork::read_uai_file(&input_file, lg)?;
        info!(
            "UAI import complete. Elapsed time {:?}.",
            time_start.elapsed()
        );

        let mut block_icm = BlockIcm::new(&cfn);
        let energy = block_icm.run(&options);

        info!(
            "Finished processing instance {}. Energy {}. Labels {:?}.\n\n\n",
            filename,
            energy,
            block_icm.labels()
        );
    }

    Ok(())
}
