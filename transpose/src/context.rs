use crate::error::TransposeError;
use crate::layout::MatrixLayout;
use crate::transposer::{transposer_for, LocalTranspose};
use crate::view::{StridedView, StridedViewMut};
use config::Parameters;
use log::debug;
use model::types_and_const::PeerId;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Everything a peer resolves once before the first iteration.
pub struct RunContext {
    pub me: PeerId,
    pub num_peers: usize,
    pub parameters: Parameters,
    pub layout: MatrixLayout,
    pool: ThreadPool,
    transposer: Box<dyn LocalTranspose>,
}

impl RunContext {
    /// Sizes the partition of `me` and builds its thread pool. The parameters must already be
    /// valid for `num_peers`.
    pub fn new(
        me: PeerId,
        num_peers: usize,
        parameters: Parameters,
    ) -> Result<Self, TransposeError> {
        let layout = MatrixLayout::new(me, num_peers, &parameters)?;
        let threads = parameters.threads;
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("peer-{}-worker-{}", me, i))
            .build()
            .map_err(|source| TransposeError::ThreadPool { threads, source })?;
        debug!("Peer {} uses {:?}", me, layout.strategy);

        Ok(Self {
            me,
            num_peers,
            transposer: transposer_for(layout.strategy),
            parameters,
            layout,
            pool,
        })
    }

    /// Runs `op` inside the thread pool of the peer.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Transposes `src` into `dst` with the strategy chosen for this run.
    pub fn transpose_block(&self, src: StridedView<'_>, dst: StridedViewMut<'_>) {
        self.install(|| self.transposer.transpose(src, dst));
    }
}
