//! Histogram under both disciplines, with a timing comparison.
//!
//! Every rank builds `N` values cycling through `[min, max]` and runs the
//! point-to-point and the collective histogram between barriers. The
//! coordinator prints both count vectors and their timings.
//!
//! Run with: FERROPAR_NPROCS=4 cargo run --example histogram_compare [N] [BINS]

use ferropar::{histogram, BinSpec, Discipline, Partition, Result, World};
use std::time::Instant;

const MIN_VAL: i64 = 0;
const MAX_VAL: i64 = 99;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let n: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(1_000);
    let num_bins: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(10);

    let world = World::from_env()?;
    println!(
        "Group started. N={} ranks={} bins={} range=[{}, {}]",
        n,
        world.size(),
        num_bins,
        MIN_VAL,
        MAX_VAL
    );

    let spec = BinSpec::new(num_bins, MIN_VAL, MAX_VAL);
    let partition = Partition::for_histogram(n, world.size());
    if let Some(e) = spec.err().or(partition.err()) {
        eprintln!("Invalid configuration: {e}. Aborting.");
        std::process::exit(1);
    }

    let span = (MAX_VAL - MIN_VAL + 1) as usize;
    let data: Vec<i64> = (0..n).map(|i| MIN_VAL + (i * 7 % span) as i64).collect();

    let results = world.run(|comm| {
        let mut timed = Vec::with_capacity(Discipline::ALL.len());
        for discipline in Discipline::ALL {
            comm.barrier()?;
            let start = Instant::now();
            let counts = histogram(comm, discipline, &data, num_bins, MIN_VAL, MAX_VAL)?;
            comm.barrier()?;
            timed.push((discipline, counts, start.elapsed()));
        }
        Ok(timed)
    })?;

    let coordinator = &results[0];
    for (discipline, counts, _) in coordinator {
        let total: u64 = counts.iter().sum();
        println!("Counts {:<16} {:?} (total {})", format!("{discipline}:"), counts, total);
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
