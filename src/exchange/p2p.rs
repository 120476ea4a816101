//! Combine protocol built from directed send/receive operations.
//!
//! The coordinator talks to every other rank in rank order `1..size`; the
//! other ranks only ever talk to the coordinator. Each phase uses its own tag,
//! so a message can only be matched by the receive of the phase it belongs to.

use super::Exchange;
use crate::comm::Communicator;
use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::partition::Partition;
use crate::scan::exclusive_offsets;
use crate::{ReduceOp, COORDINATOR};
use std::slice;
use tracing::trace;

/// Message tags of the point-to-point protocol, one per phase.
pub mod tags {
    /// Shard of the input, coordinator → worker
    pub const DATA: i32 = 0;
    /// Shard total, worker → coordinator
    pub const TOTAL: i32 = 1;
    /// Shard offset, coordinator → worker
    pub const OFFSET: i32 = 2;
    /// Finalized shard, worker → coordinator
    pub const RESULT: i32 = 3;
    /// Bin counts, worker → coordinator
    pub const COUNTS: i32 = 4;
}

/// Point-to-point implementation of [`Exchange`].
#[derive(Debug, Clone, Copy, Default)]
pub struct P2pExchange;

impl P2pExchange {
    fn recv_exact<T: Datatype>(
        comm: &Communicator,
        buf: &mut [T],
        source: i32,
        tag: i32,
    ) -> Result<()> {
        let status = comm.recv(buf, source, tag)?;
        if status.count != buf.len() {
            return Err(Error::InvalidBuffer);
        }
        Ok(())
    }
}

impl Exchange for P2pExchange {
    fn name(&self) -> &'static str {
        "p2p"
    }

    fn distribute<T: Datatype>(
        &self,
        comm: &Communicator,
        partition: &Partition,
        input: &[T],
    ) -> Result<Vec<T>> {
        if comm.is_coordinator() {
            for peer in 1..comm.size() {
                trace!(peer, "p2p: sending shard");
                comm.send(&input[partition.shard_range(peer)], peer, tags::DATA)?;
            }
            Ok(input[partition.shard_range(COORDINATOR)].to_vec())
        } else {
            let mut shard = vec![T::ZERO; partition.shard_size()];
            Self::recv_exact(comm, &mut shard, COORDINATOR, tags::DATA)?;
            Ok(shard)
        }
    }

    fn exchange_offset<T: Datatype>(&self, comm: &Communicator, total: T) -> Result<T> {
        if comm.is_coordinator() {
            let mut totals = vec![T::ZERO; comm.size() as usize];
            totals[0] = total;
            for peer in 1..comm.size() {
                let slot = slice::from_mut(&mut totals[peer as usize]);
                Self::recv_exact(comm, slot, peer, tags::TOTAL)?;
            }

            let offsets = exclusive_offsets(&totals);
            trace!(?totals, ?offsets, "p2p: offsets computed");
            for peer in 1..comm.size() {
                let offset = offsets[peer as usize];
                comm.send(slice::from_ref(&offset), peer, tags::OFFSET)?;
            }
            Ok(offsets[0])
        } else {
            comm.send(slice::from_ref(&total), COORDINATOR, tags::TOTAL)?;
            let mut offset = T::ZERO;
            Self::recv_exact(comm, slice::from_mut(&mut offset), COORDINATOR, tags::OFFSET)?;
            Ok(offset)
        }
    }

    fn collect<T: Datatype>(
        &self,
        comm: &Communicator,
        partition: &Partition,
        shard: &[T],
    ) -> Result<Vec<T>> {
        if comm.is_coordinator() {
            let mut global = vec![T::ZERO; partition.len()];
            global[partition.shard_range(COORDINATOR)].copy_from_slice(shard);
            for peer in 1..comm.size() {
                let range = partition.shard_range(peer);
                Self::recv_exact(comm, &mut global[range], peer, tags::RESULT)?;
            }
            Ok(global)
        } else {
            comm.send(shard, COORDINATOR, tags::RESULT)?;
            Ok(Vec::new())
        }
    }

    fn combine_counts(&self, comm: &Communicator, counts: &[u64]) -> Result<Vec<u64>> {
        if comm.is_coordinator() {
            let mut global = counts.to_vec();
            let mut received = vec![0u64; counts.len()];
            for peer in 1..comm.size() {
                Self::recv_exact(comm, &mut received, peer, tags::COUNTS)?;
                for (acc, &count) in global.iter_mut().zip(&received) {
                    *acc = ReduceOp::Sum.apply(*acc, count);
                }
            }
            Ok(global)
        } else {
            comm.send(counts, COORDINATOR, tags::COUNTS)?;
            Ok(Vec::new())
        }
    }
}
