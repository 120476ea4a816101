//! Cross-partition combine protocols.
//!
//! An [`Exchange`] realizes the distribute → combine → redistribute → collect
//! steps of the engines. Two implementations produce bit-identical results:
//!
//! | Discipline | Type | Mechanism |
//! |------------|------|-----------|
//! | [`Discipline::PointToPoint`] | [`P2pExchange`] | tagged send/recv between the coordinator and each peer |
//! | [`Discipline::Collective`] | [`CollectiveExchange`] | scatter, gather and reduce over the whole group |
//!
//! Every method is called by every rank (SPMD). Values only significant at
//! the coordinator are empty elsewhere.

mod collective;
mod p2p;

pub use collective::CollectiveExchange;
pub use p2p::{tags, P2pExchange};

use crate::comm::Communicator;
use crate::datatype::Datatype;
use crate::error::Result;
use crate::partition::Partition;
use std::fmt;

/// Communication discipline used by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// Explicit directed messages with phase tags
    PointToPoint,
    /// Symmetric group operations
    Collective,
}

impl Discipline {
    /// Both disciplines, in a fixed order.
    pub const ALL: [Discipline; 2] = [Discipline::PointToPoint, Discipline::Collective];
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::PointToPoint => f.write_str("point-to-point"),
            Discipline::Collective => f.write_str("collective"),
        }
    }
}

/// A combine protocol shared by the scan and histogram engines.
pub trait Exchange {
    /// Short name used in log events.
    fn name(&self) -> &'static str;

    /// Hand every rank its shard of `input`.
    ///
    /// `input` is only read at the coordinator.
    fn distribute<T: Datatype>(
        &self,
        comm: &Communicator,
        partition: &Partition,
        input: &[T],
    ) -> Result<Vec<T>>;

    /// Combine per-shard totals into per-shard offsets.
    ///
    /// Each rank contributes its shard total and gets back the sum of the
    /// totals of all lower ranks.
    fn exchange_offset<T: Datatype>(&self, comm: &Communicator, total: T) -> Result<T>;

    /// Collect finalized shards into the logical array at the coordinator.
    ///
    /// Returns the full array at the coordinator and an empty vector elsewhere.
    fn collect<T: Datatype>(
        &self,
        comm: &Communicator,
        partition: &Partition,
        shard: &[T],
    ) -> Result<Vec<T>>;

    /// Sum every rank's bin counts element-wise at the coordinator.
    ///
    /// Returns the histogram at the coordinator and an empty vector elsewhere.
    fn combine_counts(&self, comm: &Communicator, counts: &[u64]) -> Result<Vec<u64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discipline_display() {
        assert_eq!(Discipline::PointToPoint.to_string(), "point-to-point");
        assert_eq!(Discipline::Collective.to_string(), "collective");
        assert_eq!(Discipline::ALL.len(), 2);
    }

    #[test]
    fn exchange_names() {
        assert_eq!(P2pExchange.name(), "p2p");
        assert_eq!(CollectiveExchange.name(), "collective");
    }
}
