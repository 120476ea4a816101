//! Exclusive scan under both disciplines, with a timing comparison.
//!
//! Every rank builds the input `1..=N`, validates the configuration before any
//! communication, then runs the point-to-point and the collective scan between
//! barriers. The coordinator prints both results and their timings.
//!
//! Run with: FERROPAR_NPROCS=4 cargo run --example scan_compare [N]

use ferropar::{scan, Discipline, Partition, Result, World};
use std::time::Instant;

const DEFAULT_N: usize = 64;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let n = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_N);

    let world = World::from_env()?;
    println!("Group started. N={} ranks={}", n, world.size());

    if let Err(e) = Partition::for_scan(n, world.size()) {
        eprintln!("Invalid configuration: {e}. Aborting.");
        std::process::exit(1);
    }

    let data: Vec<i32> = (1..=n as i32).collect();

    let results = world.run(|comm| {
        let mut timed = Vec::with_capacity(Discipline::ALL.len());
        for discipline in Discipline::ALL {
            comm.barrier()?;
            let start = Instant::now();
            let result = scan(comm, discipline, &data)?;
            comm.barrier()?;
            timed.push((discipline, result, start.elapsed()));
        }
        Ok(timed)
    })?;

    let coordinator = &results[0];
    for (discipline, result, _) in coordinator {
        println!("Result {:<16} {:?}", format!("{discipline}:"), result);
    }

    println!("\nTiming comparison (s):");
    println!("Discipline         Time");
    println!("----------------------------");
    for (discipline, _, elapsed) in coordinator {
        println!("{:<18} {:.6}", discipline.to_string(), elapsed.as_secs_f64());
    }

    assert_eq!(coordinator[0].1, coordinator[1].1, "disciplines disagree");
    Ok(())
}
