//! Safe communicator operations over an in-process SPMD group.

use crate::datatype::{Datatype, DatatypeTag};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::{ReduceOp, COORDINATOR};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

// Negative tags are reserved for collectives so they never match user traffic.
const TAG_BARRIER_ARRIVE: i32 = -1;
const TAG_BARRIER_RELEASE: i32 = -2;
const TAG_SCATTER: i32 = -3;
const TAG_GATHER: i32 = -4;
const TAG_REDUCE: i32 = -5;
const TAG_BROADCAST: i32 = -6;

/// A message in flight between two ranks.
pub(crate) struct Envelope {
    tag: i32,
    datatype: DatatypeTag,
    payload: Box<dyn Any + Send>,
}

/// A communicator bound to one rank of a [`World`](crate::World).
///
/// Provides blocking point-to-point and collective operations. Messages from
/// one sender are never overtaken by later messages from the same sender, and
/// a receive only matches a message with the requested source and tag.
///
/// # Example
///
/// ```
/// use ferropar::{GroupConfig, World};
///
/// let ranks = World::new(GroupConfig::new(4))
///     .run(|world| Ok(world.rank()))
///     .unwrap();
/// assert_eq!(ranks, vec![0, 1, 2, 3]);
/// ```
pub struct Communicator {
    rank: i32,
    size: i32,
    /// Sending ends, indexed by destination rank
    outboxes: Vec<Sender<Envelope>>,
    /// Receiving ends, indexed by source rank
    inboxes: Vec<Receiver<Envelope>>,
    /// Messages that arrived ahead of a receive for their tag, per source
    stash: RefCell<Vec<VecDeque<Envelope>>>,
    recv_timeout: Option<Duration>,
}

impl Communicator {
    pub(crate) fn new(
        rank: i32,
        size: i32,
        outboxes: Vec<Sender<Envelope>>,
        inboxes: Vec<Receiver<Envelope>>,
        recv_timeout: Option<Duration>,
    ) -> Self {
        let stash = RefCell::new((0..inboxes.len()).map(|_| VecDeque::new()).collect());
        Communicator {
            rank,
            size,
            outboxes,
            inboxes,
            stash,
            recv_timeout,
        }
    }

    /// Get the rank of the calling worker in this communicator.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of workers in this communicator.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Whether the calling worker is the coordinator (rank 0).
    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }

    fn check_rank(&self, rank: i32) -> Result<usize> {
        if rank < 0 || rank >= self.size {
            return Err(Error::InvalidRank(rank));
        }
        Ok(rank as usize)
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All workers in the communicator must call this function. No worker
    /// will return until all workers have entered the barrier.
    pub fn barrier(&self) -> Result<()> {
        trace!(rank = self.rank, "barrier");
        if self.size == 1 {
            return Ok(());
        }
        if self.is_coordinator() {
            for peer in 1..self.size {
                self.take::<i32>(peer, TAG_BARRIER_ARRIVE)?;
            }
            for peer in 1..self.size {
                self.post::<i32>(Vec::new(), peer, TAG_BARRIER_RELEASE)?;
            }
        } else {
            self.post::<i32>(Vec::new(), COORDINATOR, TAG_BARRIER_ARRIVE)?;
            self.take::<i32>(COORDINATOR, TAG_BARRIER_RELEASE)?;
        }
        Ok(())
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send a slice of values to another worker.
    ///
    /// Never blocks: the message is buffered until the destination receives it.
    pub fn send<T: Datatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        if tag < 0 {
            return Err(Error::InvalidTag(tag));
        }
        self.post(data.to_vec(), dest, tag)
    }

    /// Receive values from `source` sent with `tag` into `buf`.
    ///
    /// Blocks until a matching message is available. The message may be
    /// shorter than `buf`; the returned [`Status`] reports the actual count.
    pub fn recv<T: Datatype>(&self, buf: &mut [T], source: i32, tag: i32) -> Result<Status> {
        if tag < 0 {
            return Err(Error::InvalidTag(tag));
        }
        let data = self.take::<T>(source, tag)?;
        if data.len() > buf.len() {
            return Err(Error::Truncated {
                count: data.len(),
                capacity: buf.len(),
            });
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok(Status {
            source,
            tag,
            count: data.len(),
        })
    }

    fn post<T: Datatype>(&self, data: Vec<T>, dest: i32, tag: i32) -> Result<()> {
        let index = self.check_rank(dest)?;
        trace!(rank = self.rank, dest, tag, count = data.len(), "send");
        let envelope = Envelope {
            tag,
            datatype: T::TAG,
            payload: Box::new(data),
        };
        self.outboxes[index]
            .send(envelope)
            .map_err(|_| Error::PeerDisconnected(dest))
    }

    fn take<T: Datatype>(&self, source: i32, tag: i32) -> Result<Vec<T>> {
        let index = self.check_rank(source)?;
        let envelope = self.match_envelope(index, source, tag)?;
        trace!(rank = self.rank, source, tag, "recv");
        if envelope.datatype != T::TAG {
            return Err(Error::DatatypeMismatch {
                expected: T::TAG,
                actual: envelope.datatype,
            });
        }
        envelope
            .payload
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| Error::Internal("payload does not match its datatype tag".into()))
    }

    fn match_envelope(&self, index: usize, source: i32, tag: i32) -> Result<Envelope> {
        {
            let mut stash = self.stash.borrow_mut();
            let pending = &mut stash[index];
            if let Some(envelope) = pending
                .iter()
                .position(|e| e.tag == tag)
                .and_then(|pos| pending.remove(pos))
            {
                return Ok(envelope);
            }
        }

        loop {
            let inbox = &self.inboxes[index];
            let envelope = match self.recv_timeout {
                Some(timeout) => inbox.recv_timeout(timeout).map_err(|e| match e {
                    RecvTimeoutError::Timeout => Error::Timeout { peer: source, tag },
                    RecvTimeoutError::Disconnected => Error::PeerDisconnected(source),
                })?,
                None => inbox.recv().map_err(|_| Error::PeerDisconnected(source))?,
            };
            if envelope.tag == tag {
                return Ok(envelope);
            }
            self.stash.borrow_mut()[index].push_back(envelope);
        }
    }

    // ========================================================================
    // Blocking Collectives
    // ========================================================================
    //
    // Every collective starts with a barrier: no participant proceeds until
    // the whole group has entered the call.

    /// Scatter equal parts of `send` from `root` to all workers.
    ///
    /// Root sends `recv.len() * size` elements total, each worker receives
    /// `recv.len()` elements. `send` is only significant at root.
    pub fn scatter<T: Datatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.check_rank(root)?;
        self.barrier()?;
        trace!(rank = self.rank, root, count = recv.len(), "scatter");

        let count = recv.len();
        if self.rank == root {
            if send.len() != count * self.size as usize {
                return Err(Error::InvalidBuffer);
            }
            for peer in 0..self.size {
                let start = peer as usize * count;
                let part = &send[start..start + count];
                if peer == root {
                    recv.copy_from_slice(part);
                } else {
                    self.post(part.to_vec(), peer, TAG_SCATTER)?;
                }
            }
        } else {
            let data = self.take::<T>(root, TAG_SCATTER)?;
            if data.len() != count {
                return Err(Error::InvalidBuffer);
            }
            recv.copy_from_slice(&data);
        }
        Ok(())
    }

    /// Scatter one value per worker from `root`.
    ///
    /// Convenience method; `send` must hold `size` values at root.
    pub fn scatter_scalar<T: Datatype>(&self, send: &[T], root: i32) -> Result<T> {
        let mut recv = [T::ZERO];
        self.scatter(send, &mut recv, root)?;
        Ok(recv[0])
    }

    /// Gather equal parts from all workers into `recv` at `root`.
    ///
    /// Each worker sends `send.len()` elements; `recv` must hold
    /// `send.len() * size` elements at root and is ignored elsewhere.
    pub fn gather<T: Datatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.check_rank(root)?;
        self.barrier()?;
        trace!(rank = self.rank, root, count = send.len(), "gather");

        let count = send.len();
        if self.rank == root {
            if recv.len() != count * self.size as usize {
                return Err(Error::InvalidBuffer);
            }
            for peer in 0..self.size {
                let start = peer as usize * count;
                let slot = &mut recv[start..start + count];
                if peer == root {
                    slot.copy_from_slice(send);
                } else {
                    let data = self.take::<T>(peer, TAG_GATHER)?;
                    if data.len() != count {
                        return Err(Error::InvalidBuffer);
                    }
                    slot.copy_from_slice(&data);
                }
            }
        } else {
            self.post(send.to_vec(), root, TAG_GATHER)?;
        }
        Ok(())
    }

    /// Gather one value per worker into `recv` at `root`.
    pub fn gather_scalar<T: Datatype>(&self, value: T, recv: &mut [T], root: i32) -> Result<()> {
        self.gather(&[value], recv, root)
    }

    /// Broadcast `data` from `root` to all workers.
    ///
    /// Every worker must pass a buffer of the same length as root's.
    pub fn broadcast<T: Datatype>(&self, data: &mut [T], root: i32) -> Result<()> {
        self.check_rank(root)?;
        self.barrier()?;
        trace!(rank = self.rank, root, count = data.len(), "broadcast");

        if self.rank == root {
            for peer in (0..self.size).filter(|&p| p != root) {
                self.post(data.to_vec(), peer, TAG_BROADCAST)?;
            }
        } else {
            let received = self.take::<T>(root, TAG_BROADCAST)?;
            if received.len() != data.len() {
                return Err(Error::InvalidBuffer);
            }
            data.copy_from_slice(&received);
        }
        Ok(())
    }

    /// Element-wise reduce of `send` across all workers into `recv` at `root`.
    ///
    /// Root folds each peer's contribution into `recv` as it arrives, one
    /// peer at a time.
    ///
    /// # Arguments
    ///
    /// * `send` - Data contributed by this worker
    /// * `recv` - Buffer for the result (only significant at root)
    /// * `op` - Reduction operation
    /// * `root` - Rank of the root worker
    pub fn reduce<T: Datatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        op: ReduceOp,
        root: i32,
    ) -> Result<()> {
        self.check_rank(root)?;
        self.barrier()?;
        trace!(rank = self.rank, root, count = send.len(), ?op, "reduce");

        if self.rank == root {
            if recv.len() != send.len() {
                return Err(Error::InvalidBuffer);
            }
            recv.copy_from_slice(send);
            for peer in (0..self.size).filter(|&p| p != root) {
                let data = self.take::<T>(peer, TAG_REDUCE)?;
                if data.len() != recv.len() {
                    return Err(Error::InvalidBuffer);
                }
                for (acc, value) in recv.iter_mut().zip(data) {
                    *acc = op.apply(*acc, value);
                }
            }
        } else {
            self.post(send.to_vec(), root, TAG_REDUCE)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, GroupConfig, World};

    #[test]
    fn single_rank_collectives_are_local() {
        let results = World::new(GroupConfig::new(1))
            .run(|world| {
                world.barrier()?;
                let mut part = [0u32; 3];
                world.scatter(&[1, 2, 3], &mut part, 0)?;
                let mut all = [0u32; 3];
                world.gather(&part, &mut all, 0)?;
                let mut sum = [0u32; 3];
                world.reduce(&all, &mut sum, crate::ReduceOp::Sum, 0)?;
                world.broadcast(&mut sum, 0)?;
                Ok(sum)
            })
            .unwrap();
        assert_eq!(results, vec![[1, 2, 3]]);
    }

    #[test]
    fn rejects_out_of_range_peers_and_reserved_tags() {
        World::new(GroupConfig::new(1))
            .run(|world| {
                assert_eq!(world.send(&[1i32], 1, 0), Err(Error::InvalidRank(1)));
                assert_eq!(world.send(&[1i32], -1, 0), Err(Error::InvalidRank(-1)));
                assert_eq!(world.send(&[1i32], 0, -3), Err(Error::InvalidTag(-3)));
                let mut buf = [0i32; 1];
                assert_eq!(world.recv(&mut buf, 0, -1), Err(Error::InvalidTag(-1)));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn self_send_is_buffered() {
        World::new(GroupConfig::new(1))
            .run(|world| {
                world.send(&[4i64, 5], 0, 9)?;
                let mut buf = [0i64; 2];
                let status = world.recv(&mut buf, 0, 9)?;
                assert_eq!(status.count, 2);
                assert_eq!(buf, [4, 5]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn root_buffer_size_is_checked() {
        World::new(GroupConfig::new(1))
            .run(|world| {
                let mut part = [0i32; 2];
                assert_eq!(
                    world.scatter(&[1, 2, 3], &mut part, 0),
                    Err(Error::InvalidBuffer)
                );
                let mut small = [0i32; 1];
                assert_eq!(world.gather(&[1, 2], &mut small, 0), Err(Error::InvalidBuffer));
                Ok(())
            })
            .unwrap();
    }
}
