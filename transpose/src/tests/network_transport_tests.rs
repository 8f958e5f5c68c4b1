use super::*;
use config::{ConfigError, Parameters};
use futures::future::try_join_all;

async fn exchange_over_tcp(base_port: u16, compress: bool) {
    let committee = Committee::local(2, base_port).unwrap();
    let handles = (0..2).map(|me| {
        let committee = committee.clone();
        tokio::spawn(async move {
            let listen = committee.address(me).unwrap();
            let mut comm = Communicator::connect(me, &committee, listen).await?;
            comm.configure(&Parameters {
                compress,
                ..Parameters::default()
            });

            let other = 1 - me;
            let outgoing: Vec<f64> = (0..64).map(|x| (100 * me + x) as f64).collect();
            let mut incoming = vec![0.0; 64];
            comm.send_recv(other, other, 0, 1, &outgoing, &mut incoming)
                .await?;
            let any = comm.all_reduce_or(me == 1).await?;
            Ok::<_, TransposeError>((me, incoming, any))
        })
    });

    for result in try_join_all(handles).await.unwrap() {
        let (me, incoming, any) = result.unwrap();
        let other = 1 - me;
        let expected: Vec<f64> = (0..64).map(|x| (100 * other + x) as f64).collect();
        assert_eq!(incoming, expected);
        assert!(any);
    }
}

#[tokio::test]
async fn blocks_over_tcp() {
    exchange_over_tcp(6200, false).await;
}

#[tokio::test]
async fn compressed_blocks_over_tcp() {
    exchange_over_tcp(6210, true).await;
}

#[tokio::test]
async fn peer_outside_committee() {
    let committee = Committee::local(2, 6220).unwrap();
    let listen = committee.address(0).unwrap();
    match Communicator::connect(2, &committee, listen).await {
        Err(TransposeError::Config(ConfigError::NotInCommittee(2))) => (),
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Peer 2 joined a committee of 2"),
    }
}

#[tokio::test]
async fn block_too_large_for_a_frame() {
    let committee = Committee::local(2, 6230).unwrap();
    let handles = (0..2).map(|me| {
        let committee = committee.clone();
        tokio::spawn(async move {
            let listen = committee.address(me).unwrap();
            let mut comm = Communicator::connect(me, &committee, listen).await?;
            let parameters = Parameters {
                threads: 1,
                iterations: 1,
                order: 2 * 16_384,
                ..Parameters::default()
            };
            crate::run(&mut comm, parameters).await
        })
    });

    // Rejected before anything is allocated.
    let results = try_join_all(handles).await.unwrap();
    match &results[0] {
        Err(TransposeError::Config(ConfigError::BlockTooLarge { block_order, .. })) => {
            assert_eq!(*block_order, 16_384)
        }
        other => panic!("Unexpected result: {:?}", other),
    }
    assert!(matches!(
        results[1],
        Err(TransposeError::Config(ConfigError::RejectedByRoot))
    ));
}
