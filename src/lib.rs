//! # ferropar
//!
//! Distributed exclusive scan and histogram over a group of cooperating
//! workers that share nothing and talk only through tagged messages.
//!
//! This crate provides:
//! - An in-process SPMD runtime: [`World`] runs one thread per rank, each with
//!   its own [`Communicator`]
//! - Blocking point-to-point (`send`/`recv`) and collective (barrier, scatter,
//!   gather, reduce) operations
//! - A work-efficient (Blelloch) exclusive scan and a clamping histogram, each
//!   combined across ranks under two disciplines that produce bit-identical
//!   results: explicit point-to-point messaging ([`Discipline::PointToPoint`])
//!   and group collectives ([`Discipline::Collective`])
//!
//! ## Supported Types
//!
//! All operations are generic over [`Datatype`]: `i32`, `i64`, `u32`, `u64`.
//!
//! ## Quick Start
//!
//! ```
//! use ferropar::{scan, Discipline, GroupConfig, World};
//!
//! fn main() -> Result<(), ferropar::Error> {
//!     let input: Vec<i32> = (1..=8).collect();
//!
//!     let results = World::new(GroupConfig::new(2)).run(|world| {
//!         // Only the coordinator's input is read.
//!         let local: &[i32] = if world.is_coordinator() { &input } else { &[] };
//!         scan(world, Discipline::Collective, local)
//!     })?;
//!
//!     assert_eq!(results[0], vec![0, 1, 3, 6, 10, 15, 21, 28]);
//!     assert!(results[1].is_empty());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `FERROPAR_NPROCS` | Group size read by [`GroupConfig::from_env`] | `1` |
//! | `FERROPAR_RECV_TIMEOUT_MS` | Fail a receive after this many milliseconds | block forever |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod comm;
mod config;
mod datatype;
mod engine;
mod error;
pub mod exchange;
mod histogram;
mod partition;
mod scan;
mod status;

pub use comm::Communicator;
pub use config::{GroupConfig, NPROCS_VAR, RECV_TIMEOUT_VAR};
pub use datatype::{Datatype, DatatypeTag};
pub use engine::{histogram, histogram_with, scan, scan_with};
pub use error::{Error, Result};
pub use exchange::{CollectiveExchange, Discipline, Exchange, P2pExchange};
pub use histogram::{count_bins, BinSpec};
pub use partition::Partition;
pub use scan::{add_offset, blelloch_scan, exclusive_offsets};
pub use status::Status;

use comm::Envelope;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread;
use tracing::{debug, warn};

/// Rank of the coordinator: the only rank that holds the logical array and
/// the combine state.
pub const COORDINATOR: i32 = 0;

/// Reduction operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of values (wrapping)
    Sum,
    /// Maximum value
    Max,
    /// Minimum value
    Min,
    /// Product of values (wrapping)
    Prod,
}

impl ReduceOp {
    /// Combine two values under this operation.
    pub fn apply<T: Datatype>(self, lhs: T, rhs: T) -> T {
        match self {
            ReduceOp::Sum => lhs.wrapping_add(rhs),
            ReduceOp::Max => lhs.max(rhs),
            ReduceOp::Min => lhs.min(rhs),
            ReduceOp::Prod => lhs.wrapping_mul(rhs),
        }
    }
}

/// An SPMD process group.
///
/// Each call to [`run`](Self::run) starts `size` ranks as threads with private
/// memory, wires every ordered pair of ranks with a message channel, and runs
/// the same closure on every rank.
///
/// # Example
///
/// ```
/// use ferropar::{GroupConfig, ReduceOp, World};
///
/// let sums = World::new(GroupConfig::new(4))
///     .run(|world| {
///         let mut total = [0i64];
///         world.reduce(&[world.rank() as i64], &mut total, ReduceOp::Sum, 0)?;
///         Ok(total[0])
///     })
///     .unwrap();
/// assert_eq!(sums[0], 6);
/// ```
pub struct World {
    config: GroupConfig,
}

impl World {
    /// Create a group from its configuration.
    pub fn new(config: GroupConfig) -> Self {
        World { config }
    }

    /// Create a group configured from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(World::new(GroupConfig::from_env()?))
    }

    /// Get the number of ranks in this group.
    pub fn size(&self) -> i32 {
        self.config.size
    }

    /// Get the group configuration.
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Run `body` on every rank and return the per-rank results in rank order.
    ///
    /// If any rank fails, the whole run fails. A rank that exits drops its
    /// channels, so peers waiting on it observe [`Error::PeerDisconnected`]
    /// instead of blocking forever; the error returned here is the root
    /// cause rather than that cascade whenever one is available.
    pub fn run<R, F>(&self, body: F) -> Result<Vec<R>>
    where
        F: Fn(&Communicator) -> Result<R> + Sync,
        R: Send,
    {
        self.config.validate()?;
        debug!(size = self.config.size, "starting world");

        let communicators = self.communicators();
        let body = &body;

        let outcomes: Vec<Result<R>> = thread::scope(|scope| {
            let handles: Vec<_> = communicators
                .into_iter()
                .map(|comm| {
                    let rank = comm.rank();
                    let spawned = thread::Builder::new()
                        .name(format!("ferropar-rank-{rank}"))
                        .spawn_scoped(scope, move || {
                            let outcome = body(&comm);
                            if let Err(e) = &outcome {
                                warn!(rank, error = %e, "rank failed");
                            }
                            outcome
                        });
                    (rank, spawned)
                })
                .collect();

            handles
                .into_iter()
                .map(|(rank, spawned)| match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| Err(Error::RankPanicked(rank))),
                    Err(e) => Err(Error::Internal(format!("failed to spawn rank {rank}: {e}"))),
                })
                .collect()
        });

        collect_outcomes(outcomes)
    }

    fn communicators(&self) -> Vec<Communicator> {
        let size = self.config.size as usize;
        let mut outboxes: Vec<Vec<Sender<Envelope>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Envelope>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();

        for source in 0..size {
            for dest in 0..size {
                let (tx, rx) = unbounded();
                outboxes[source].push(tx);
                inboxes[dest].push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (out, inb))| {
                Communicator::new(
                    rank as i32,
                    self.config.size,
                    out,
                    inb,
                    self.config.recv_timeout,
                )
            })
            .collect()
    }
}

fn collect_outcomes<R>(outcomes: Vec<Result<R>>) -> Result<Vec<R>> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<Error> = None;

    for outcome in outcomes {
        match outcome {
            Ok(value) => values.push(value),
            Err(e) => {
                let replace = match &first_error {
                    None => true,
                    Some(Error::PeerDisconnected(_)) => !matches!(e, Error::PeerDisconnected(_)),
                    Some(_) => false,
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_op_apply() {
        assert_eq!(ReduceOp::Sum.apply(3i32, 4), 7);
        assert_eq!(ReduceOp::Sum.apply(u32::MAX, 1), 0);
        assert_eq!(ReduceOp::Max.apply(-3i64, 2), 2);
        assert_eq!(ReduceOp::Min.apply(9u64, 2), 2);
        assert_eq!(ReduceOp::Prod.apply(6i32, 7), 42);
    }

    #[test]
    fn root_cause_wins_over_disconnects() {
        let outcomes: Vec<Result<i32>> = vec![
            Err(Error::PeerDisconnected(2)),
            Ok(1),
            Err(Error::NotPowerOfTwo(6)),
            Err(Error::InvalidBuffer),
        ];
        assert_eq!(collect_outcomes(outcomes), Err(Error::NotPowerOfTwo(6)));

        let outcomes: Vec<Result<i32>> = vec![Ok(1), Err(Error::PeerDisconnected(0))];
        assert_eq!(collect_outcomes(outcomes), Err(Error::PeerDisconnected(0)));
    }

    #[test]
    fn invalid_group_size_is_rejected_before_spawning() {
        let err = World::new(GroupConfig::new(0)).run(|_| Ok(())).unwrap_err();
        assert_eq!(err, Error::InvalidGroupSize(0));
    }

    #[test]
    fn results_are_in_rank_order() {
        let results = World::new(GroupConfig::new(5))
            .run(|world| Ok((world.rank(), world.size(), world.is_coordinator())))
            .unwrap();
        assert_eq!(results.len(), 5);
        for (i, (rank, size, coordinator)) in results.into_iter().enumerate() {
            assert_eq!(rank, i as i32);
            assert_eq!(size, 5);
            assert_eq!(coordinator, i == 0);
        }
    }

    #[test]
    fn panicking_rank_is_reported() {
        let err = World::new(GroupConfig::new(2))
            .run(|world| {
                if world.rank() == 1 {
                    panic!("boom");
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, Error::RankPanicked(1));
    }
}
