use config::{Committee, ExchangeMode, Parameters};
use futures::future::try_join_all;
use transpose::{run, Communicator, TransposeError};

async fn run_over_tcp(base_port: u16, parameters: Parameters) {
    let committee = Committee::local(3, base_port).unwrap();
    let handles = (0..3).map(|me| {
        let committee = committee.clone();
        let parameters = parameters.clone();
        tokio::spawn(async move {
            let listen = committee.address(me)?;
            let mut comm = Communicator::connect(me, &committee, listen).await?;
            run(&mut comm, parameters).await
        })
    });

    let results: Vec<Result<_, TransposeError>> = try_join_all(handles).await.unwrap();
    for (me, result) in results.into_iter().enumerate() {
        let report = result.unwrap();
        if me == 0 {
            let report = report.unwrap();
            assert!(report.validates(), "{}", report);
            assert_eq!(report.num_peers, 3);
            assert_eq!(report.error, 0.0);
        } else {
            assert!(report.is_none());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapped_benchmark_over_tcp() {
    let parameters = Parameters {
        threads: 2,
        iterations: 3,
        order: 48,
        tile_order: 4,
        ..Parameters::default()
    };
    run_over_tcp(6300, parameters).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn compressed_blocking_benchmark_over_tcp() {
    let parameters = Parameters {
        threads: 1,
        iterations: 2,
        order: 30,
        tile_order: 0,
        exchange: ExchangeMode::Blocking,
        compress: true,
        ..Parameters::default()
    };
    run_over_tcp(6310, parameters).await;
}
