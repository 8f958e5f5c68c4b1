use crate::comm::Communicator;
use crate::context::RunContext;
use crate::error::TransposeError;
use crate::exchange::ExchangeScheduler;
use crate::fault::agree_on_fault;
use crate::layout::MatrixLayout;
use crate::messages::CollectivePayload;
use crate::report::Report;
use crate::storage::{ColumnBlock, Matrices};
use crate::timer::IterationTimer;
use crate::validator::local_error;
use config::{ConfigError, Parameters};
use log::{debug, info, warn};
use model::types_and_const::ROOT;

#[cfg(test)]
#[path = "tests/peer_tests.rs"]
pub mod peer_tests;

/// The state of one peer between setup and the final report.
pub struct Benchmark {
    ctx: RunContext,
    matrices: Matrices,
    scheduler: ExchangeScheduler,
}

impl Benchmark {
    /// Agrees with the other peers on the parameters of the run and prepares the local
    /// matrices. Only the parameters of the root matter: it validates them and sends them to
    /// everybody else.
    pub async fn setup(
        comm: &mut Communicator,
        parameters: Parameters,
    ) -> Result<Self, TransposeError> {
        let num_peers = comm.size();
        let max_block_len = comm.max_block_len();
        let mut rejection = None;
        let payload = comm
            .broadcast(|| {
                let checked = parameters.validate(num_peers).and_then(|()| {
                    max_block_len.map_or(Ok(()), |max_len| {
                        parameters.check_block_len(num_peers, max_len)
                    })
                });
                match checked {
                    Ok(()) => CollectivePayload::Parameters(Some(parameters)),
                    Err(e) => {
                        rejection = Some(e);
                        CollectivePayload::Parameters(None)
                    }
                }
            })
            .await?;
        let parameters = match payload {
            CollectivePayload::Parameters(Some(parameters)) => parameters,
            CollectivePayload::Parameters(None) => {
                return Err(rejection.unwrap_or(ConfigError::RejectedByRoot).into());
            }
            payload => {
                return Err(TransposeError::UnexpectedMessage {
                    peer: ROOT,
                    message: format!("{:?}", payload),
                });
            }
        };

        comm.configure(&parameters);
        if comm.is_root() {
            info!("Number of peers set to {}", num_peers);
            parameters.log();
        }

        let me = comm.me();
        let prepared = RunContext::new(me, num_peers, parameters).and_then(|ctx| {
            let matrices = Matrices::allocate(&ctx.layout)?;
            Ok((ctx, matrices))
        });
        if let Err(e) = &prepared {
            warn!("{}", e);
        }
        if agree_on_fault(comm, prepared.is_err()).await? {
            return Err(prepared.err().unwrap_or(TransposeError::RemoteSetup));
        }
        let (ctx, mut matrices) = prepared?;

        matrices.initialize(&ctx);
        let layout = &ctx.layout;
        debug!(
            "Peer {} owns columns {}..{}",
            me,
            layout.colstart,
            layout.colstart + layout.block_order
        );

        Ok(Self {
            scheduler: ExchangeScheduler::new(ctx.parameters.exchange),
            ctx,
            matrices,
        })
    }

    pub fn layout(&self) -> &MatrixLayout {
        &self.ctx.layout
    }

    /// The destination column block of this peer.
    pub fn transposed(&self) -> &ColumnBlock {
        &self.matrices.b
    }

    /// Runs the warm-up iteration followed by the timed ones. Returns the seconds this peer
    /// spent in the timed iterations.
    pub async fn iterate(&mut self, comm: &mut Communicator) -> Result<f64, TransposeError> {
        let mut timer = IterationTimer::default();
        for iteration in 0..=self.ctx.parameters.iterations {
            if iteration == 1 {
                comm.barrier().await?;
                timer.start();
            }
            self.scheduler
                .transpose(&self.ctx, comm, &mut self.matrices, iteration)
                .await?;
            debug!("Iteration {} completed", iteration);
        }
        Ok(timer.elapsed())
    }

    /// Validates the result and builds the report at the root. All peers fail if the
    /// solution does not validate.
    pub async fn finish(
        &self,
        comm: &mut Communicator,
        elapsed: f64,
    ) -> Result<Option<Report>, TransposeError> {
        let elapsed = comm.reduce_max(elapsed).await?;
        let error = comm
            .reduce_sum(local_error(&self.ctx, &self.matrices.b))
            .await?;

        let report = match (elapsed, error) {
            (Some(elapsed), Some(error)) => Some(Report::new(&self.ctx, elapsed, error)),
            _ => None,
        };
        let invalid = report.as_ref().map_or(false, |report| !report.validates());
        if comm.all_reduce_or(invalid).await? {
            return Err(TransposeError::Validation {
                report: report.map(Box::new),
            });
        }
        Ok(report)
    }
}

/// Runs the whole benchmark on one peer. The root returns the report.
///
/// A failure that the other peers cannot know about is announced to them before returning,
/// so that nobody keeps waiting for this peer.
pub async fn run(
    comm: &mut Communicator,
    parameters: Parameters,
) -> Result<Option<Report>, TransposeError> {
    let result = execute(comm, parameters).await;
    if let Err(e) = &result {
        if !e.is_collective() {
            warn!("Peer {} aborts the run: {}", comm.me(), e);
            comm.abort(&e.to_string()).await;
        }
    }
    result
}

async fn execute(
    comm: &mut Communicator,
    parameters: Parameters,
) -> Result<Option<Report>, TransposeError> {
    let mut benchmark = Benchmark::setup(comm, parameters).await?;
    let elapsed = benchmark.iterate(comm).await?;
    benchmark.finish(comm, elapsed).await
}
