//! Message-passing runtime tests: tag matching, buffer checks, collectives and
//! failure propagation across a multi-rank group.

use ferropar::{Error, GroupConfig, ReduceOp, World};
use std::time::Duration;

#[test]
fn messages_are_matched_by_tag_not_arrival_order() {
    World::new(GroupConfig::new(2))
        .run(|world| {
            if world.rank() == 1 {
                world.send(&[1i32], 0, 10)?;
                world.send(&[2i32], 0, 20)?;
                world.send(&[3i32], 0, 10)?;
            } else {
                let mut buf = [0i32; 1];
                world.recv(&mut buf, 1, 20)?;
                assert_eq!(buf, [2]);
                world.recv(&mut buf, 1, 10)?;
                assert_eq!(buf, [1]);
                world.recv(&mut buf, 1, 10)?;
                assert_eq!(buf, [3]);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn messages_are_matched_by_source() {
    World::new(GroupConfig::new(3))
        .run(|world| {
            match world.rank() {
                0 => {
                    let mut buf = [0u64; 2];
                    let status = world.recv(&mut buf, 2, 7)?;
                    assert_eq!((status.source, buf), (2, [20, 21]));
                    let status = world.recv(&mut buf, 1, 7)?;
                    assert_eq!((status.source, buf), (1, [10, 11]));
                }
                r => world.send(&[r as u64 * 10, r as u64 * 10 + 1], 0, 7)?,
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn ring_exchange() {
    let size = 4;
    World::new(GroupConfig::new(size))
        .run(|world| {
            let rank = world.rank();
            let next = (rank + 1) % size;
            let prev = (rank + size - 1) % size;

            world.send(&[rank * 100 + 1, rank * 100 + 2], next, 0)?;
            let mut recv = [0i32; 2];
            let status = world.recv(&mut recv, prev, 0)?;

            assert_eq!(status.source, prev);
            assert_eq!(status.count, 2);
            assert_eq!(recv, [prev * 100 + 1, prev * 100 + 2]);
            world.barrier()
        })
        .unwrap();
}

#[test]
fn oversized_message_is_truncation_error() {
    let err = World::new(GroupConfig::new(2))
        .run(|world| {
            if world.rank() == 0 {
                world.send(&[1i32, 2, 3], 1, 0)?;
            } else {
                let mut buf = [0i32; 2];
                world.recv(&mut buf, 0, 0)?;
            }
            Ok(())
        })
        .unwrap_err();
    assert_eq!(
        err,
        Error::Truncated {
            count: 3,
            capacity: 2
        }
    );
}

#[test]
fn wrong_element_type_is_rejected() {
    let err = World::new(GroupConfig::new(2))
        .run(|world| {
            if world.rank() == 0 {
                world.send(&[1u64], 1, 0)?;
            } else {
                let mut buf = [0i32; 1];
                world.recv(&mut buf, 0, 0)?;
            }
            Ok(())
        })
        .unwrap_err();
    assert_eq!(
        err,
        Error::DatatypeMismatch {
            expected: ferropar::DatatypeTag::I32,
            actual: ferropar::DatatypeTag::U64
        }
    );
}

#[test]
fn receive_from_exited_peer_fails_instead_of_hanging() {
    let err = World::new(GroupConfig::new(2))
        .run(|world| {
            if world.rank() == 1 {
                let mut buf = [0i32; 1];
                world.recv(&mut buf, 0, 3)?;
            }
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err, Error::PeerDisconnected(0));
}

#[test]
fn failing_rank_unblocks_the_group() {
    // Rank 2 fails before the barrier; the others must not deadlock, and the
    // root cause is what the run reports.
    let err = World::new(GroupConfig::new(4))
        .run(|world| {
            if world.rank() == 2 {
                return Err(Error::Internal("rank 2 gave up".into()));
            }
            world.barrier()
        })
        .unwrap_err();
    assert_eq!(err, Error::Internal("rank 2 gave up".into()));
}

#[test]
fn stalled_receive_times_out() {
    let config = GroupConfig::new(2).with_recv_timeout(Duration::from_millis(50));
    let err = World::new(config)
        .run(|world| {
            if world.rank() == 0 {
                let mut buf = [0i32; 1];
                world.recv(&mut buf, 1, 4)?;
            } else {
                // Stay alive without sending until rank 0 gives up.
                std::thread::sleep(Duration::from_millis(300));
            }
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err, Error::Timeout { peer: 1, tag: 4 });
}

#[test]
fn scatter_and_gather_round_trip() {
    let size = 4;
    let results = World::new(GroupConfig::new(size))
        .run(|world| {
            let send: Vec<i64> = if world.is_coordinator() {
                (0..12).collect()
            } else {
                Vec::new()
            };
            let mut part = [0i64; 3];
            world.scatter(&send, &mut part, 0)?;
            let base = world.rank() as i64 * 3;
            assert_eq!(part, [base, base + 1, base + 2]);

            let mut all = if world.is_coordinator() {
                vec![0i64; 12]
            } else {
                Vec::new()
            };
            world.gather(&part, &mut all, 0)?;
            Ok(all)
        })
        .unwrap();
    assert_eq!(results[0], (0..12).collect::<Vec<i64>>());
    assert!(results[1..].iter().all(Vec::is_empty));
}

#[test]
fn scalar_collectives_with_non_zero_root() {
    let results = World::new(GroupConfig::new(3))
        .run(|world| {
            let mut ranks = vec![0i32; if world.rank() == 2 { 3 } else { 0 }];
            world.gather_scalar(world.rank() * 7, &mut ranks, 2)?;
            let doubled: Vec<i32> = ranks.iter().map(|r| r * 2).collect();
            world.scatter_scalar(&doubled, 2)
        })
        .unwrap();
    assert_eq!(results, vec![0, 14, 28]);
}

#[test]
fn broadcast_from_non_zero_root() {
    let results = World::new(GroupConfig::new(3))
        .run(|world| {
            let mut data = if world.rank() == 1 { [7u32, 8] } else { [0, 0] };
            world.broadcast(&mut data, 1)?;
            Ok(data)
        })
        .unwrap();
    assert_eq!(results, vec![[7, 8]; 3]);
}

#[test]
fn reduce_operations() {
    let size = 4;
    for (op, expected) in [
        (ReduceOp::Sum, [10i64, -10]),
        (ReduceOp::Max, [4, -1]),
        (ReduceOp::Min, [1, -4]),
        (ReduceOp::Prod, [24, 24]),
    ] {
        let results = World::new(GroupConfig::new(size))
            .run(|world| {
                let value = world.rank() as i64 + 1;
                let mut out = vec![0i64; if world.is_coordinator() { 2 } else { 0 }];
                world.reduce(&[value, -value], &mut out, op, 0)?;
                Ok(out)
            })
            .unwrap();
        assert_eq!(results[0], expected.to_vec(), "{op:?}");
    }
}

#[test]
fn invalid_root_is_rejected_on_every_rank() {
    let err = World::new(GroupConfig::new(2))
        .run(|world| {
            let mut out = [0i32; 1];
            world.scatter(&[1, 2], &mut out, 5)
        })
        .unwrap_err();
    assert_eq!(err, Error::InvalidRank(5));
}

#[test]
fn world_from_environment_defaults_to_one_rank() {
    let unset = |key: &str| std::env::var(key).is_err();
    if unset(ferropar::NPROCS_VAR) && unset(ferropar::RECV_TIMEOUT_VAR) {
        let world = World::from_env().unwrap();
        assert_eq!(world.size(), 1);
        assert!(world.config().recv_timeout.is_none());
    }
}
