//! Distributed scan and histogram engines.
//!
//! Both engines are a single role function run by every rank; the rank's
//! behavior only branches on [`Communicator::is_coordinator`] inside the
//! exchange. The logical length is broadcast from the coordinator first, so
//! every rank validates the same configuration and a configuration error is
//! returned by every rank before any data moves.

use crate::comm::Communicator;
use crate::datatype::Datatype;
use crate::error::Result;
use crate::COORDINATOR;
use crate::exchange::{CollectiveExchange, Discipline, Exchange, P2pExchange};
use crate::histogram::{count_bins, BinSpec};
use crate::partition::Partition;
use crate::scan::{add_offset, blelloch_scan};
use tracing::debug;

/// Distributed exclusive scan of `input`.
///
/// `input` is only significant at the coordinator; other ranks may pass an
/// empty slice. Returns `result[k] = input[0] + … +
/// input[k - 1]` at the coordinator and an empty vector on every other rank.
///
/// # Errors
///
/// Configuration errors (identical on every rank, no data exchanged) when the
/// coordinator's input length is not a positive power of two divisible by the group
/// size; protocol errors if a peer fails mid-exchange.
pub fn scan<T: Datatype>(
    comm: &Communicator,
    discipline: Discipline,
    input: &[T],
) -> Result<Vec<T>> {
    match discipline {
        Discipline::PointToPoint => scan_with(&P2pExchange, comm, input),
        Discipline::Collective => scan_with(&CollectiveExchange, comm, input),
    }
}

/// Distributed exclusive scan using an explicit [`Exchange`].
pub fn scan_with<E: Exchange, T: Datatype>(
    exchange: &E,
    comm: &Communicator,
    input: &[T],
) -> Result<Vec<T>> {
    let rank = comm.rank();
    let partition = Partition::for_scan(logical_len(comm, input)?, comm.size())?;
    debug!(
        rank,
        exchange = exchange.name(),
        len = partition.len(),
        shard_size = partition.shard_size(),
        "scan: distributing shards"
    );

    let mut shard = exchange.distribute(comm, &partition, input)?;

    let total = blelloch_scan(&mut shard);
    debug!(rank, ?total, "scan: local scan done");

    let offset = exchange.exchange_offset(comm, total)?;
    add_offset(&mut shard, offset);
    debug!(rank, ?offset, "scan: shard finalized");

    let result = exchange.collect(comm, &partition, &shard)?;

    // Keeps a fast rank from entering the next invocation early.
    comm.barrier()?;
    Ok(result)
}

/// Distributed histogram of `input` over `num_bins` bins spanning
/// `[min_val, max_val]`.
///
/// Same rank-scoping rule as [`scan`]: the `num_bins`-long count vector is
/// returned at the coordinator, an empty vector elsewhere. Values outside the
/// range are counted in the first or last bin.
///
/// # Errors
///
/// Configuration errors when the coordinator's input length is not divisible by the group size,
/// `num_bins` is zero, or the range is empty or holds fewer values than bins.
pub fn histogram<T: Datatype>(
    comm: &Communicator,
    discipline: Discipline,
    input: &[T],
    num_bins: usize,
    min_val: i64,
    max_val: i64,
) -> Result<Vec<u64>> {
    let spec = BinSpec::new(num_bins, min_val, max_val)?;
    match discipline {
        Discipline::PointToPoint => histogram_with(&P2pExchange, comm, input, &spec),
        Discipline::Collective => histogram_with(&CollectiveExchange, comm, input, &spec),
    }
}

/// Distributed histogram using an explicit [`Exchange`] and a prevalidated [`BinSpec`].
pub fn histogram_with<E: Exchange, T: Datatype>(
    exchange: &E,
    comm: &Communicator,
    input: &[T],
    spec: &BinSpec,
) -> Result<Vec<u64>> {
    let rank = comm.rank();
    let partition = Partition::for_histogram(logical_len(comm, input)?, comm.size())?;
    debug!(
        rank,
        exchange = exchange.name(),
        len = partition.len(),
        num_bins = spec.num_bins(),
        bin_width = %spec.bin_width(),
        "histogram: distributing shards"
    );

    let shard = exchange.distribute(comm, &partition, input)?;

    let counts = count_bins(&shard, spec);
    debug!(rank, ?counts, "histogram: local counts done");

    let result = exchange.combine_counts(comm, &counts)?;

    comm.barrier()?;
    Ok(result)
}

/// Length of the coordinator's input, as seen by every rank.
fn logical_len<T: Datatype>(comm: &Communicator, input: &[T]) -> Result<usize> {
    let mut len = [input.len() as u64];
    comm.broadcast(&mut len, COORDINATOR)?;
    Ok(len[0] as usize)
}
