use crate::layout::TransposeStrategy;
use crate::view::{StridedView, StridedViewMut};
use rayon::prelude::*;

#[cfg(test)]
#[path = "tests/transposer_tests.rs"]
pub mod transposer_tests;

/// Writes `dst(c, r) = src(r, c)` for every element of `src`.
///
/// Implementations only decide the order in which elements are visited and how the work is
/// split between threads; they must all write the same values. Parallel work items own disjoint
/// parts of `dst`. Callers run them inside the thread pool of the peer.
pub trait LocalTranspose: Send + Sync {
    fn transpose(&self, src: StridedView<'_>, dst: StridedViewMut<'_>);
}

/// Returns the implementation matching a resolved strategy.
pub fn transposer_for(strategy: TransposeStrategy) -> Box<dyn LocalTranspose> {
    match strategy {
        TransposeStrategy::Flat => Box::new(FlatTranspose),
        TransposeStrategy::Tiled { tile_order } => Box::new(TiledTranspose { tile_order }),
        TransposeStrategy::CollapsedTiled { tile_order } => {
            Box::new(CollapsedTiledTranspose { tile_order })
        }
    }
}

fn check_shapes(src: &StridedView<'_>, dst: &StridedViewMut<'_>) {
    assert_eq!(
        (src.rows(), src.cols()),
        (dst.cols(), dst.rows()),
        "destination is not shaped like the transposed source"
    );
}

/// Row `r` of the source becomes column `r` of the destination; one column per work item.
pub struct FlatTranspose;

impl LocalTranspose for FlatTranspose {
    fn transpose(&self, src: StridedView<'_>, dst: StridedViewMut<'_>) {
        check_shapes(&src, &dst);
        dst.par_columns_mut().enumerate().for_each(|(r, column)| {
            for (c, value) in column.iter_mut().enumerate() {
                // SAFETY: `r < src.rows()` and `c < src.cols()` by the shape check.
                *value = unsafe { src.get_unchecked(r, c) };
            }
        });
    }
}

/// Walks the block tile by tile; every work item owns one column of tiles of the destination.
pub struct TiledTranspose {
    pub tile_order: usize,
}

impl LocalTranspose for TiledTranspose {
    fn transpose(&self, src: StridedView<'_>, dst: StridedViewMut<'_>) {
        check_shapes(&src, &dst);
        let tile_order = self.tile_order;
        let height = dst.rows();
        dst.par_column_groups_mut(tile_order)
            .for_each(|(first_col, mut columns)| {
                for first_row in (0..height).step_by(tile_order) {
                    let last_row = height.min(first_row + tile_order);
                    for (k, column) in columns.iter_mut().enumerate() {
                        let r = first_col + k;
                        for c in first_row..last_row {
                            // SAFETY: `r < src.rows()` and `c < src.cols()` by the shape check.
                            column[c] = unsafe { src.get_unchecked(r, c) };
                        }
                    }
                }
            });
    }
}

/// Same walk as `TiledTranspose`, but every single tile is a work item.
pub struct CollapsedTiledTranspose {
    pub tile_order: usize,
}

impl LocalTranspose for CollapsedTiledTranspose {
    fn transpose(&self, src: StridedView<'_>, dst: StridedViewMut<'_>) {
        check_shapes(&src, &dst);
        dst.into_tiles(self.tile_order)
            .into_par_iter()
            .for_each(|mut tile| {
                let (first_row, first_col) = (tile.first_row, tile.first_col);
                for (k, piece) in tile.columns.iter_mut().enumerate() {
                    for (l, value) in piece.iter_mut().enumerate() {
                        // SAFETY: tiles never extend past the destination, whose shape
                        // mirrors the source.
                        *value = unsafe { src.get_unchecked(first_col + k, first_row + l) };
                    }
                }
            });
    }
}
