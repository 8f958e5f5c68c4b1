use super::*;
use crate::local_mesh;
use config::Parameters;
use futures::future::try_join_all;

// Runs `iterations` transposes on a local mesh and returns the destination block of every peer.
async fn transpose_on_mesh(
    num_peers: usize,
    parameters: Parameters,
    iterations: usize,
) -> Vec<Vec<f64>> {
    let handles = local_mesh(num_peers).into_iter().map(|mut comm| {
        let parameters = parameters.clone();
        tokio::spawn(async move {
            let ctx = RunContext::new(comm.me(), num_peers, parameters.clone())?;
            let mut matrices = Matrices::allocate(&ctx.layout)?;
            matrices.initialize(&ctx);
            let scheduler = ExchangeScheduler::new(parameters.exchange);
            for iteration in 0..iterations {
                scheduler
                    .transpose(&ctx, &mut comm, &mut matrices, iteration)
                    .await?;
            }
            Ok::<_, TransposeError>(matrices.b.as_slice().to_vec())
        })
    });
    try_join_all(handles)
        .await
        .unwrap()
        .into_iter()
        .map(|result| result.unwrap())
        .collect()
}

fn expected(num_peers: usize, order: usize) -> Vec<Vec<f64>> {
    let block_order = order / num_peers;
    (0..num_peers)
        .map(|me| {
            (0..block_order)
                .flat_map(|j| (0..order).map(move |i| (order * i + j + me * block_order) as f64))
                .collect()
        })
        .collect()
}

fn parameters(exchange: ExchangeMode, tile_order: usize) -> Parameters {
    Parameters {
        threads: 2,
        order: 12,
        tile_order,
        exchange,
        ..Parameters::default()
    }
}

#[tokio::test]
async fn blocking_exchange() {
    let blocks = transpose_on_mesh(3, parameters(ExchangeMode::Blocking, 0), 1).await;
    assert_eq!(blocks, expected(3, 12));
}

#[tokio::test]
async fn overlapped_exchange() {
    let blocks = transpose_on_mesh(4, parameters(ExchangeMode::Overlapped, 2), 2).await;
    assert_eq!(blocks, expected(4, 12));
}

#[tokio::test]
async fn exchange_modes_agree() {
    for num_peers in [1, 2, 3, 4, 6] {
        let blocking =
            transpose_on_mesh(num_peers, parameters(ExchangeMode::Blocking, 1), 1).await;
        let overlapped =
            transpose_on_mesh(num_peers, parameters(ExchangeMode::Overlapped, 1), 1).await;
        assert_eq!(blocking, overlapped);
        assert_eq!(blocking, expected(num_peers, 12));
    }
}

#[tokio::test]
async fn one_column_per_peer() {
    let blocks = transpose_on_mesh(12, parameters(ExchangeMode::Overlapped, 0), 1).await;
    assert_eq!(blocks, expected(12, 12));
}
