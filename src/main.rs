use classroster::io;
use classroster::optimizer::{self, OptimizerOptions};
use classroster::Problem;
use clap::{command, value_parser, Arg, ArgAction};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    let args = command!()
        .arg(
            Arg::new("INPUT")
                .help("Input JSON file with constraints, rules and students")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("OUTPUT")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the resulting classrooms as JSON to this file"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .value_parser(value_parser!(u64))
                .help("Seed for the random choices, to get reproducible results"),
        )
        .arg(
            Arg::new("max_moves")
                .long("max-moves")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Maximum number of moves per rule (0 = unlimited)"),
        )
        .arg(
            Arg::new("time_limit")
                .long("time-limit")
                .value_name("SECONDS")
                .value_parser(value_parser!(f64))
                .help("Stop the optimization after this time"),
        )
        .arg(
            Arg::new("print")
                .short('p')
                .long("print")
                .action(ArgAction::SetTrue)
                .help("Print the classrooms in a human readable format to stdout"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log the progress of the optimization"),
        )
        .get_matches();

    let default_level = if args.get_flag("verbose") { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut options = OptimizerOptions {
        seed: args.get_one::<u64>("seed").copied(),
        ..Default::default()
    };
    if let Some(max_moves) = args.get_one::<usize>("max_moves") {
        options.max_moves_per_rule = *max_moves;
    }
    if let Some(seconds) = args.get_one::<f64>("time_limit") {
        if !seconds.is_finite() || *seconds < 0.0 {
            error!("Invalid time limit: {}", seconds);
            std::process::exit(exitcode::USAGE);
        }
        options.time_limit = Some(Duration::from_secs_f64(*seconds));
    }

    // Read input data
    let inpath = args.get_one::<String>("INPUT").unwrap();
    let file = match std::fs::File::open(inpath) {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open input file {}: {}", inpath, e);
            std::process::exit(exitcode::NOINPUT);
        }
    };
    let input = match io::simple::read(std::io::BufReader::new(file)) {
        Ok(x) => x,
        Err(e) => {
            error!("Could not read input file: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    let problem = match Problem::new(input) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            error!("Invalid input data: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!(
        "Created {} rules for {} students with {} attributes.",
        problem.rules.len(),
        problem.students.len(),
        problem.catalog.len()
    );

    // Optimize
    let solution = optimizer::solve(problem, &options);
    for report in solution.rules.iter() {
        info!(
            "Rule {} ({}, priority {}): value {}, {:.1}% satisfied, {} moves, {:?}",
            report.rule,
            report.key,
            report.priority,
            report.value,
            report.satisfaction * 100.0,
            report.moves,
            report.outcome
        );
    }

    // Write output
    let outpath = args.get_one::<String>("OUTPUT");
    if args.get_flag("print") || outpath.is_none() {
        print!("{}", io::format_configuration(&solution.configuration));
    }
    if let Some(outpath) = outpath {
        let file = match std::fs::File::create(outpath) {
            Ok(f) => f,
            Err(e) => {
                error!("Could not open output file {}: {}", outpath, e);
                std::process::exit(exitcode::CANTCREAT);
            }
        };
        if let Err(e) = io::simple::write(std::io::BufWriter::new(file), &solution) {
            error!("Could not write output file: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    }
}
