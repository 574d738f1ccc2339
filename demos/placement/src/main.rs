use std::time::Instant;

use clap::Parser;
use log::error;

use dslab_placement::batch::BatchPlanner;
use dslab_placement::catalog::Catalog;
use dslab_placement::config::PlacementConfig;
use dslab_placement::decision::Decision;
use dslab_placement::error::Result;
use dslab_placement::optimizer::PlacementOptimizer;

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to placement config with candidates and requests
    #[clap(short, long)]
    config: String,

    /// Number of threads used to solve requests in parallel
    #[clap(short, long, default_value_t = 1)]
    threads: usize,

    /// Directory for the JSON report of all decisions (parallel mode only)
    #[clap(short, long)]
    report_dir: Option<String>,
}

fn print_decision(catalog: &Catalog, decision: &Decision) {
    match decision {
        Decision::Placed { selected, objective } => {
            println!("Selected hypervisors: {:?} (cost {:.2})", selected, objective);
            for name in selected {
                if let Some(candidate) = catalog.get(name) {
                    println!(
                        "  {} with {} vCPUs, {} RAM, location: {}",
                        name,
                        candidate.vcpu_capacity,
                        candidate.ram_capacity,
                        candidate.location.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
        Decision::Rejected { status, detail } => {
            println!("No placement: {:?} {}", status, detail.as_deref().unwrap_or(""));
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = PlacementConfig::from_file(&args.config)?;
    let catalog = config.build_catalog()?;
    let requests = config.build_requests()?;
    let optimizer = PlacementOptimizer::from_config(&config)?;

    if args.threads > 1 || args.report_dir.is_some() {
        let mut planner = BatchPlanner::new(optimizer, &catalog);
        if let Some(dir) = &args.report_dir {
            planner = planner.with_report_dir(dir);
        }
        for (id, result) in planner.run(requests, args.threads)?.into_iter().enumerate() {
            println!("REQUEST {}:", id);
            match result {
                Ok(decision) => print_decision(&catalog, &decision),
                Err(e) => println!("Error: {}", e),
            }
        }
        return Ok(());
    }

    for (id, request) in requests.iter().enumerate() {
        println!(
            "REQUEST {}: vcpu={} ram={} feature={:?} policy={}",
            id, request.required_vcpu, request.required_ram, request.required_feature, request.selection_count_policy
        );
        let report = optimizer.decide_with_report(&catalog, request)?;
        for (name, value) in &report.values {
            match value {
                Some(value) => println!("  x_{} = {}", name, value),
                None => println!("  x_{} = -", name),
            }
        }
        print_decision(&catalog, &report.decision);
    }
    Ok(())
}

fn main() {
    init_logger();

    let args = Args::parse();
    let start = Instant::now();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
    println!("Placement process time {:.2?}", start.elapsed());
}
