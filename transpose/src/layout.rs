use crate::error::TransposeError;
use config::Parameters;
use model::types_and_const::PeerId;

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
pub mod layout_tests;

/// How the local transpose walks a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransposeStrategy {
    /// One destination column per work item.
    Flat,
    /// One column of tiles per work item.
    Tiled { tile_order: usize },
    /// One tile per work item.
    CollapsedTiled { tile_order: usize },
}

impl TransposeStrategy {
    pub fn tile_order(&self) -> Option<usize> {
        match self {
            TransposeStrategy::Flat => None,
            TransposeStrategy::Tiled { tile_order }
            | TransposeStrategy::CollapsedTiled { tile_order } => Some(*tile_order),
        }
    }
}

/// Partition of the global matrix as seen by one peer.
///
/// Each peer owns `block_order` consecutive columns of both the source and the destination
/// matrix, stored column-major with all `order` rows. That column block is logically made of
/// `num_peers` square blocks, one per peer, which are the unit of communication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixLayout {
    /// Order of the global matrix.
    pub order: usize,
    /// Number of peers sharing the matrix.
    pub num_peers: usize,
    /// Index of the peer owning this layout.
    pub me: PeerId,
    /// Number of columns owned by each peer; also the side of a block.
    pub block_order: usize,
    /// First global column owned by this peer.
    pub colstart: usize,
    /// Number of elements in a column block.
    pub col_block_size: usize,
    /// Number of elements in a block.
    pub block_size: usize,
    /// Resolved local transpose strategy.
    pub strategy: TransposeStrategy,
}

impl MatrixLayout {
    /// Sizes the partition of `me`. The parameters must already have been validated against
    /// `num_peers`.
    ///
    /// Fails with an allocation error when the global matrix has more elements than a `usize`
    /// can index, since element values and offsets are derived from `order * order`.
    pub fn new(
        me: PeerId,
        num_peers: usize,
        parameters: &Parameters,
    ) -> Result<Self, TransposeError> {
        let order = parameters.order;
        assert!(
            num_peers > 0 && order >= num_peers && order % num_peers == 0,
            "order {} does not partition across {} peers",
            order,
            num_peers
        );
        assert!(me < num_peers, "peer {} is out of range", me);

        let indexable = order
            .checked_mul(order)
            .and_then(|elements| elements.checked_mul(2 * std::mem::size_of::<f64>()))
            .is_some();
        if !indexable {
            return Err(TransposeError::Allocation {
                peer: me,
                what: "the matrix index space",
            });
        }

        let block_order = order / num_peers;
        let strategy = Self::strategy(order, block_order, parameters);

        Ok(Self {
            order,
            num_peers,
            me,
            block_order,
            colstart: block_order * me,
            col_block_size: order * block_order,
            block_size: block_order * block_order,
            strategy,
        })
    }

    /// Number of work items a tiled transpose of one block can keep busy.
    pub fn concurrency(block_order: usize, tile_order: usize, collapse: bool) -> usize {
        let tiles = (block_order + tile_order - 1) / tile_order;
        if collapse {
            tiles * tiles
        } else {
            tiles
        }
    }

    fn strategy(order: usize, block_order: usize, parameters: &Parameters) -> TransposeStrategy {
        let tile_order = parameters.tile_order;
        if tile_order == 0 || tile_order >= order {
            return TransposeStrategy::Flat;
        }

        // Fewer tiles than threads would leave threads idle; the flat walk spreads better.
        let concurrency = Self::concurrency(block_order, tile_order, parameters.collapse);
        if parameters.idle_thread_guard && concurrency < parameters.threads {
            return TransposeStrategy::Flat;
        }

        if parameters.collapse {
            TransposeStrategy::CollapsedTiled { tile_order }
        } else {
            TransposeStrategy::Tiled { tile_order }
        }
    }

    pub fn tiling(&self) -> bool {
        self.strategy != TransposeStrategy::Flat
    }

    /// First row of the block owned by `owner` inside any column block.
    pub fn block_start(&self, owner: PeerId) -> usize {
        owner * self.block_order
    }

    /// Value of the source matrix at global `(row, col)` before the first iteration.
    pub fn source_value(&self, row: usize, col: usize) -> f64 {
        (self.order * col + row) as f64
    }

    /// Value of the destination matrix at global `(row, col)` once transposed.
    pub fn transposed_value(&self, row: usize, col: usize) -> f64 {
        (self.order * row + col) as f64
    }
}
