use crate::comm::Communicator;
use crate::context::RunContext;
use crate::error::TransposeError;
use crate::storage::Matrices;
use async_trait::async_trait;
use config::ExchangeMode;
use log::trace;
use model::types_and_const::{ring_partners, Iteration};

#[cfg(test)]
#[path = "tests/exchange_tests.rs"]
pub mod exchange_tests;

/// Runs phases `1..num_peers` of the ring exchange for one iteration. At every phase the
/// peer sends the transposed block of `send_to` and scatters the block of `recv_from` into `B`.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn run_phases(
        &self,
        ctx: &RunContext,
        comm: &mut Communicator,
        matrices: &mut Matrices,
        iteration: Iteration,
    ) -> Result<(), TransposeError>;
}

/// Transposes the outgoing block, then sends it and waits for the incoming one together.
pub struct BlockingExchange;

#[async_trait]
impl Exchange for BlockingExchange {
    async fn run_phases(
        &self,
        ctx: &RunContext,
        comm: &mut Communicator,
        matrices: &mut Matrices,
        iteration: Iteration,
    ) -> Result<(), TransposeError> {
        let Matrices { a, b, workspace } = matrices;
        let workspace = match workspace.as_mut() {
            Some(workspace) => workspace,
            None => return Ok(()),
        };

        for phase in 1..ctx.num_peers {
            let (recv_from, send_to) = ring_partners(ctx.me, phase, ctx.num_peers);
            trace!("Phase {}: sending to {}, receiving from {}", phase, send_to, recv_from);

            ctx.transpose_block(a.block(send_to), workspace.outgoing_mut());
            comm.send_recv(
                send_to,
                recv_from,
                iteration,
                phase,
                &workspace.outgoing,
                &mut workspace.incoming,
            )
            .await?;
            b.scatter(ctx, recv_from, &workspace.incoming);
        }
        Ok(())
    }
}

/// Issues the send, then transposes the block of the next phase while the current exchange
/// completes.
pub struct OverlappedExchange;

#[async_trait]
impl Exchange for OverlappedExchange {
    async fn run_phases(
        &self,
        ctx: &RunContext,
        comm: &mut Communicator,
        matrices: &mut Matrices,
        iteration: Iteration,
    ) -> Result<(), TransposeError> {
        let Matrices { a, b, workspace } = matrices;
        let workspace = match workspace.as_mut() {
            Some(workspace) => workspace,
            None => return Ok(()),
        };
        let (me, num_peers) = (ctx.me, ctx.num_peers);

        let (_, first) = ring_partners(me, 1, num_peers);
        ctx.transpose_block(a.block(first), workspace.outgoing_mut());

        for phase in 1..num_peers {
            let (recv_from, send_to) = ring_partners(me, phase, num_peers);
            trace!("Phase {}: sending to {}, receiving from {}", phase, send_to, recv_from);

            // The message owns a copy of the block, so `outgoing` is free again.
            let handler = comm
                .isend_block(send_to, iteration, phase, &workspace.outgoing)
                .await?;
            if phase + 1 < num_peers {
                let (_, next) = ring_partners(me, phase + 1, num_peers);
                ctx.transpose_block(a.block(next), workspace.outgoing_mut());
            }

            comm.recv_block(recv_from, iteration, phase, &mut workspace.incoming)
                .await?;
            Communicator::confirm(send_to, handler).await?;
            b.scatter(ctx, recv_from, &workspace.incoming);
        }
        Ok(())
    }
}

/// Drives one iteration of the distributed transpose with the exchange chosen for the run.
pub struct ExchangeScheduler {
    exchange: Box<dyn Exchange>,
}

impl ExchangeScheduler {
    pub fn new(mode: ExchangeMode) -> Self {
        let exchange: Box<dyn Exchange> = match mode {
            ExchangeMode::Blocking => Box::new(BlockingExchange),
            ExchangeMode::Overlapped => Box::new(OverlappedExchange),
        };
        Self { exchange }
    }

    /// Transposes `A` into `B`: the diagonal block locally, every other block through the ring.
    pub async fn transpose(
        &self,
        ctx: &RunContext,
        comm: &mut Communicator,
        matrices: &mut Matrices,
        iteration: Iteration,
    ) -> Result<(), TransposeError> {
        ctx.transpose_block(matrices.a.block(ctx.me), matrices.b.block_mut(ctx.me));
        self.exchange
            .run_phases(ctx, comm, matrices, iteration)
            .await
    }
}
