//! Message status information.

/// Information about a received message.
///
/// Returned by [`Communicator::recv`](crate::Communicator::recv).
///
/// # Example
///
/// ```
/// use ferropar::{GroupConfig, World};
///
/// World::new(GroupConfig::new(2))
///     .run(|world| {
///         if world.rank() == 1 {
///             world.send(&[7i32, 8, 9], 0, 5)?;
///         } else {
///             let mut buf = [0i32; 4];
///             let status = world.recv(&mut buf, 1, 5)?;
///             assert_eq!((status.source, status.tag, status.count), (1, 5, 3));
///         }
///         Ok(())
///     })
///     .unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Number of elements in the message.
    pub count: usize,
}
