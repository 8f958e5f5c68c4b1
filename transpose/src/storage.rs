use crate::context::RunContext;
use crate::error::TransposeError;
use crate::layout::MatrixLayout;
use crate::view::{StridedView, StridedViewMut};
use model::types_and_const::{PeerId, SENTINEL};
use rayon::prelude::*;

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
pub mod storage_tests;

fn reserve(len: usize, peer: PeerId, what: &'static str) -> Result<Vec<f64>, TransposeError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| TransposeError::Allocation { peer, what })?;
    Ok(data)
}

/// The `order x block_order` slice of a matrix owned by one peer, column-major.
///
/// The memory is reserved by `allocate` but holds no element until `fill` runs, so that pages
/// are first touched by the threads that later work on them.
#[derive(Debug)]
pub struct ColumnBlock {
    data: Vec<f64>,
    len: usize,
    order: usize,
    block_order: usize,
}

impl ColumnBlock {
    pub fn allocate(
        layout: &MatrixLayout,
        what: &'static str,
    ) -> Result<Self, TransposeError> {
        Ok(Self {
            data: reserve(layout.col_block_size, layout.me, what)?,
            len: layout.col_block_size,
            order: layout.order,
            block_order: layout.block_order,
        })
    }

    /// Sets element `(row, col)` to `value(row, col)`, in parallel over the current thread pool.
    pub fn fill<F>(&mut self, value: F)
    where
        F: Fn(usize, usize) -> f64 + Sync + Send,
    {
        let order = self.order;
        self.data.clear();
        self.data
            .par_extend((0..self.len).into_par_iter().map(|k| value(k % order, k / order)));
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row + self.order * col]
    }

    /// Square block made of the rows of peer `owner`.
    pub fn block(&self, owner: PeerId) -> StridedView<'_> {
        let bo = self.block_order;
        StridedView::new(&self.data, owner * bo, self.order, bo, bo)
    }

    pub fn block_mut(&mut self, owner: PeerId) -> StridedViewMut<'_> {
        let bo = self.block_order;
        StridedViewMut::new(&mut self.data, owner * bo, self.order, bo, bo)
    }

    /// Copies `incoming`, a dense column-major block, into the block of peer `owner`.
    pub fn scatter(&mut self, ctx: &RunContext, owner: PeerId, incoming: &[f64]) {
        let bo = self.block_order;
        assert_eq!(incoming.len(), bo * bo, "incoming block has the wrong size");
        let block = self.block_mut(owner);
        ctx.install(|| {
            block
                .par_columns_mut()
                .zip(incoming.par_chunks(bo))
                .for_each(|(column, source)| column.copy_from_slice(source));
        });
    }

    /// Columns with all their rows, in parallel.
    pub fn par_columns(&self) -> impl IndexedParallelIterator<Item = &[f64]> {
        self.data.par_chunks(self.order)
    }
}

/// Scratch blocks of the ring exchange, stored densely with stride `block_order`.
#[derive(Debug)]
pub struct Workspace {
    pub outgoing: Vec<f64>,
    pub incoming: Vec<f64>,
    block_order: usize,
}

impl Workspace {
    pub fn allocate(layout: &MatrixLayout) -> Result<Self, TransposeError> {
        let mut outgoing = reserve(layout.block_size, layout.me, "the outgoing block")?;
        let mut incoming = reserve(layout.block_size, layout.me, "the incoming block")?;
        outgoing.resize(layout.block_size, 0.0);
        incoming.resize(layout.block_size, 0.0);
        Ok(Self {
            outgoing,
            incoming,
            block_order: layout.block_order,
        })
    }

    pub fn outgoing_mut(&mut self) -> StridedViewMut<'_> {
        let bo = self.block_order;
        StridedViewMut::new(&mut self.outgoing, 0, bo, bo, bo)
    }
}

/// Everything a peer stores: its column blocks of `A` and `B`, plus the exchange workspace
/// when there is anybody to exchange with.
#[derive(Debug)]
pub struct Matrices {
    pub a: ColumnBlock,
    pub b: ColumnBlock,
    pub workspace: Option<Workspace>,
}

impl Matrices {
    pub fn allocate(layout: &MatrixLayout) -> Result<Self, TransposeError> {
        let a = ColumnBlock::allocate(layout, "the source matrix")?;
        let b = ColumnBlock::allocate(layout, "the destination matrix")?;
        let workspace = if layout.num_peers > 1 {
            Some(Workspace::allocate(layout)?)
        } else {
            None
        };
        Ok(Self { a, b, workspace })
    }

    /// Loads the initial source values and marks every destination element as unwritten.
    pub fn initialize(&mut self, ctx: &RunContext) {
        let layout = &ctx.layout;
        let (a, b) = (&mut self.a, &mut self.b);
        ctx.install(|| {
            a.fill(|row, col| layout.source_value(row, col + layout.colstart));
            b.fill(|_, _| SENTINEL);
        });
    }
}
