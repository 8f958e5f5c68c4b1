use super::*;
use crate::local_mesh;
use futures::future::try_join_all;

#[tokio::test]
async fn collectives() {
    let handles = local_mesh(3).into_iter().map(|mut comm| {
        tokio::spawn(async move {
            let me = comm.me();
            comm.barrier().await?;
            let max = comm.reduce_max(me as f64).await?;
            let sum = comm.reduce_sum(me as f64 + 0.5).await?;
            let any = comm.all_reduce_or(me == 2).await?;
            let none = comm.all_reduce_or(false).await?;
            Ok::<_, TransposeError>((me, max, sum, any, none))
        })
    });
    for result in try_join_all(handles).await.unwrap() {
        let (me, max, sum, any, none) = result.unwrap();
        if me == ROOT {
            assert_eq!(max, Some(2.0));
            assert_eq!(sum, Some(4.5));
        } else {
            assert_eq!(max, None);
            assert_eq!(sum, None);
        }
        assert!(any);
        assert!(!none);
    }
}

#[tokio::test]
async fn broadcast_only_builds_payload_at_root() {
    let handles = local_mesh(2).into_iter().map(|mut comm| {
        tokio::spawn(async move {
            let me = comm.me();
            comm.broadcast(|| {
                assert_eq!(me, ROOT);
                CollectivePayload::Value(7.0)
            })
            .await
        })
    });
    for result in try_join_all(handles).await.unwrap() {
        assert_eq!(result.unwrap(), CollectivePayload::Value(7.0));
    }
}

#[tokio::test]
async fn blocks_arrive_out_of_order() {
    let mut comms = local_mesh(2);
    let mut receiver = comms.remove(0);
    let mut sender = comms.remove(0);

    let second = sender.isend_block(0, 0, 2, &[2.0, 2.0]).await.unwrap();
    let first = sender.isend_block(0, 0, 1, &[1.0, 1.0]).await.unwrap();
    Communicator::confirm(0, second).await.unwrap();
    Communicator::confirm(0, first).await.unwrap();

    let mut block = [0.0; 2];
    receiver.recv_block(1, 0, 1, &mut block).await.unwrap();
    assert_eq!(block, [1.0, 1.0]);
    receiver.recv_block(1, 0, 2, &mut block).await.unwrap();
    assert_eq!(block, [2.0, 2.0]);
}

#[tokio::test]
async fn send_recv_between_two_peers() {
    let handles = local_mesh(2).into_iter().map(|mut comm| {
        tokio::spawn(async move {
            let me = comm.me();
            let other = 1 - me;
            let mut incoming = [0.0; 3];
            comm.send_recv(other, other, 4, 1, &[me as f64; 3], &mut incoming)
                .await?;
            Ok::<_, TransposeError>((me, incoming))
        })
    });
    for result in try_join_all(handles).await.unwrap() {
        let (me, incoming) = result.unwrap();
        assert_eq!(incoming, [(1 - me) as f64; 3]);
    }
}

#[tokio::test]
async fn wrong_block_size() {
    let mut comms = local_mesh(2);
    let mut receiver = comms.remove(0);
    let mut sender = comms.remove(0);

    sender.isend_block(0, 0, 1, &[1.0; 3]).await.unwrap();
    let mut block = [0.0; 4];
    match receiver.recv_block(1, 0, 1, &mut block).await {
        Err(TransposeError::BlockSize {
            peer,
            expected,
            received,
        }) => assert_eq!((peer, expected, received), (1, 4, 3)),
        other => panic!("Unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn duplicate_block() {
    let mut comms = local_mesh(2);
    let mut receiver = comms.remove(0);
    let mut sender = comms.remove(0);

    sender.isend_block(0, 0, 1, &[1.0]).await.unwrap();
    sender.isend_block(0, 0, 1, &[1.0]).await.unwrap();
    let mut block = [0.0];
    // The first copy is waited for later, so both end up parked.
    match receiver.recv_block(1, 0, 2, &mut block).await {
        Err(TransposeError::DuplicateMessage(tag)) => assert_eq!(
            tag,
            Tag::Block {
                sender: 1,
                iteration: 0,
                phase: 1
            }
        ),
        other => panic!("Unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn abort_fails_waiting_peers() {
    let mut comms = local_mesh(3);
    let mut quitter = comms.remove(1);
    quitter.abort("out of memory").await;

    for mut comm in comms {
        let mut block = [0.0];
        match comm.recv_block(1, 0, 1, &mut block).await {
            Err(TransposeError::Aborted { peer, reason }) => {
                assert_eq!(peer, 1);
                assert_eq!(reason, "out of memory");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        // Later waits fail too.
        assert!(matches!(
            comm.recv_block(1, 0, 2, &mut block).await,
            Err(TransposeError::Aborted { .. })
        ));
    }
}

#[tokio::test]
async fn unreachable_peer() {
    let mut comms = local_mesh(2);
    let mut comm = comms.remove(0);
    drop(comms);
    assert!(matches!(
        comm.isend_block(1, 0, 1, &[0.0]).await,
        Err(TransposeError::Unreachable(1))
    ));
    assert!(matches!(
        comm.isend_block(5, 0, 1, &[0.0]).await,
        Err(TransposeError::Unreachable(5))
    ));
}
