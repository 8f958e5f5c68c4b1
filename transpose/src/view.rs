use rayon::prelude::*;

#[cfg(test)]
#[path = "tests/view_tests.rs"]
pub mod view_tests;

/// Read-only window of `rows x cols` elements over a column-major buffer.
///
/// Element `(i, j)` lives at `offset + i + stride * j`. The constructor checks once that the
/// whole window fits in the buffer and that a column never spills into the next one, which is
/// what makes `get_unchecked` sound for in-range indices.
#[derive(Clone, Copy, Debug)]
pub struct StridedView<'a> {
    data: &'a [f64],
    offset: usize,
    stride: usize,
    rows: usize,
    cols: usize,
}

fn check_window(len: usize, offset: usize, stride: usize, rows: usize, cols: usize) {
    assert!(
        offset + rows <= stride,
        "rows {}..{} do not fit in a column of {}",
        offset,
        offset + rows,
        stride
    );
    if rows > 0 && cols > 0 {
        assert!(
            offset + stride * (cols - 1) + rows <= len,
            "window of {}x{} at offset {} overruns a buffer of {}",
            rows,
            cols,
            offset,
            len
        );
    }
}

impl<'a> StridedView<'a> {
    pub fn new(data: &'a [f64], offset: usize, stride: usize, rows: usize, cols: usize) -> Self {
        check_window(data.len(), offset, stride, rows, cols);
        Self {
            data,
            offset,
            stride,
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Bounds-checked access to element `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols);
        self.data[self.offset + row + self.stride * col]
    }

    /// Access to element `(row, col)` without bounds checks in release builds.
    ///
    /// # Safety
    ///
    /// `row < self.rows()` and `col < self.cols()` must hold.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        let index = self.offset + row + self.stride * col;
        if cfg!(debug_assertions) {
            self.data[index]
        } else {
            *self.data.get_unchecked(index)
        }
    }

    /// The `rows` contiguous elements of column `col`.
    pub fn column(&self, col: usize) -> &'a [f64] {
        assert!(col < self.cols);
        let start = self.offset + self.stride * col;
        &self.data[start..start + self.rows]
    }
}

/// A rectangular piece of a `StridedViewMut`: `columns.len()` columns starting at `first_col`,
/// each holding the rows starting at `first_row`.
pub struct Tile<'a> {
    pub first_row: usize,
    pub first_col: usize,
    pub columns: Vec<&'a mut [f64]>,
}

/// Mutable counterpart of `StridedView`. Its columns are disjoint slices, so they can be handed
/// to different threads without synchronization.
#[derive(Debug)]
pub struct StridedViewMut<'a> {
    data: &'a mut [f64],
    offset: usize,
    stride: usize,
    rows: usize,
    cols: usize,
}

impl<'a> StridedViewMut<'a> {
    pub fn new(data: &'a mut [f64], offset: usize, stride: usize, rows: usize, cols: usize) -> Self {
        check_window(data.len(), offset, stride, rows, cols);
        Self {
            data,
            offset,
            stride,
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols);
        self.data[self.offset + row + self.stride * col]
    }

    /// Parallel iterator over the columns of the window, in order.
    pub fn par_columns_mut(self) -> impl IndexedParallelIterator<Item = &'a mut [f64]> {
        let (offset, rows, stride, cols) = (self.offset, self.rows, self.stride, self.cols);
        let data = self.data;
        data.par_chunks_mut(stride)
            .take(cols)
            .map(move |column| &mut column[offset..offset + rows])
    }

    /// Parallel iterator over groups of `width` consecutive columns. Items are the index of
    /// the first column of the group and its columns; the last group may be narrower.
    pub fn par_column_groups_mut(
        self,
        width: usize,
    ) -> impl IndexedParallelIterator<Item = (usize, Vec<&'a mut [f64]>)> {
        assert!(width > 0, "column groups cannot be empty");
        let (offset, rows, stride, cols) = (self.offset, self.rows, self.stride, self.cols);
        let groups = (cols + width - 1) / width;
        let data = self.data;
        data.par_chunks_mut(stride * width)
            .take(groups)
            .enumerate()
            .map(move |(group, chunk)| {
                let first_col = group * width;
                let columns = chunk
                    .chunks_mut(stride)
                    .take(width.min(cols - first_col))
                    .map(|column| &mut column[offset..offset + rows])
                    .collect();
                (first_col, columns)
            })
    }

    /// Splits the window into `tile_order x tile_order` tiles (smaller at the edges), ordered
    /// by column of tiles then by row of tiles.
    pub fn into_tiles(self, tile_order: usize) -> Vec<Tile<'a>> {
        assert!(tile_order > 0, "tiles cannot be empty");
        let (offset, rows, stride, cols) = (self.offset, self.rows, self.stride, self.cols);
        let row_tiles = (rows + tile_order - 1) / tile_order;
        let col_tiles = (cols + tile_order - 1) / tile_order;

        let mut tiles: Vec<Tile<'a>> = (0..col_tiles)
            .flat_map(|tc| {
                (0..row_tiles).map(move |tr| Tile {
                    first_row: tr * tile_order,
                    first_col: tc * tile_order,
                    columns: Vec::with_capacity(tile_order),
                })
            })
            .collect();

        let data = self.data;
        for (col, column) in data.chunks_mut(stride).take(cols).enumerate() {
            let column = &mut column[offset..offset + rows];
            for (tr, piece) in column.chunks_mut(tile_order).enumerate() {
                tiles[(col / tile_order) * row_tiles + tr].columns.push(piece);
            }
        }
        tiles
    }
}
