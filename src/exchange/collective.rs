//! Combine protocol built from group collectives.
//!
//! No peer is ever addressed directly. Each step is one collective call that
//! every rank enters, so one slow rank stalls the whole group at that step.

use super::Exchange;
use crate::comm::Communicator;
use crate::datatype::Datatype;
use crate::error::Result;
use crate::partition::Partition;
use crate::scan::exclusive_offsets;
use crate::{ReduceOp, COORDINATOR};

/// Collective implementation of [`Exchange`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectiveExchange;

/// A buffer of `len` zeros at the coordinator, empty elsewhere.
fn coordinator_buffer<T: Datatype>(comm: &Communicator, len: usize) -> Vec<T> {
    if comm.is_coordinator() {
        vec![T::ZERO; len]
    } else {
        Vec::new()
    }
}

impl Exchange for CollectiveExchange {
    fn name(&self) -> &'static str {
        "collective"
    }

    fn distribute<T: Datatype>(
        &self,
        comm: &Communicator,
        partition: &Partition,
        input: &[T],
    ) -> Result<Vec<T>> {
        let mut shard = vec![T::ZERO; partition.shard_size()];
        let send: &[T] = if comm.is_coordinator() { input } else { &[] };
        comm.scatter(send, &mut shard, COORDINATOR)?;
        Ok(shard)
    }

    fn exchange_offset<T: Datatype>(&self, comm: &Communicator, total: T) -> Result<T> {
        let mut totals = coordinator_buffer(comm, comm.size() as usize);
        comm.gather_scalar(total, &mut totals, COORDINATOR)?;

        let offsets = if comm.is_coordinator() {
            exclusive_offsets(&totals)
        } else {
            Vec::new()
        };
        comm.scatter_scalar(&offsets, COORDINATOR)
    }

    fn collect<T: Datatype>(
        &self,
        comm: &Communicator,
        partition: &Partition,
        shard: &[T],
    ) -> Result<Vec<T>> {
        let mut global = coordinator_buffer(comm, partition.len());
        comm.gather(shard, &mut global, COORDINATOR)?;
        Ok(global)
    }

    fn combine_counts(&self, comm: &Communicator, counts: &[u64]) -> Result<Vec<u64>> {
        let mut global = coordinator_buffer(comm, counts.len());
        comm.reduce(counts, &mut global, ReduceOp::Sum, COORDINATOR)?;
        Ok(global)
    }
}
