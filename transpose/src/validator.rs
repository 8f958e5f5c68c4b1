use crate::context::RunContext;
use crate::storage::ColumnBlock;
use rayon::prelude::*;

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
pub mod validator_tests;

/// Sum of the absolute differences between the destination column block of this peer and
/// the transposed source, computed analytically.
pub fn local_error(ctx: &RunContext, b: &ColumnBlock) -> f64 {
    let layout = &ctx.layout;
    ctx.install(|| {
        b.par_columns()
            .enumerate()
            .map(|(j, column)| {
                column
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        (value - layout.transposed_value(i, j + layout.colstart)).abs()
                    })
                    .sum::<f64>()
            })
            .sum()
    })
}
