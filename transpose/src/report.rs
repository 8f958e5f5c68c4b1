use crate::context::RunContext;
use crate::layout::TransposeStrategy;
use config::ExchangeMode;
use model::types_and_const::{transpose_bytes, EPSILON};
use std::fmt;

#[cfg(test)]
#[path = "tests/report_tests.rs"]
pub mod report_tests;

#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// `avg_time` in seconds, `rate` in MB/s.
    Validates { avg_time: f64, rate: f64 },
    Fails { error: f64, epsilon: f64 },
}

/// Outcome of a run, as assembled by the root peer.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub num_peers: usize,
    pub threads: usize,
    pub order: usize,
    pub iterations: usize,
    pub strategy: TransposeStrategy,
    pub exchange: ExchangeMode,
    /// Blocks were zlib-compressed on the wire, inside the timed region.
    pub compressed: bool,
    pub verbose: bool,
    /// Summed absolute error over all peers.
    pub error: f64,
    pub verdict: Verdict,
}

impl Report {
    /// `elapsed` is the slowest time of all peers for the timed iterations.
    pub fn new(ctx: &RunContext, elapsed: f64, error: f64) -> Self {
        let parameters = &ctx.parameters;
        let verdict = if error < EPSILON {
            let avg_time = elapsed / parameters.iterations as f64;
            let rate = 1.0e-6 * transpose_bytes(parameters.order) as f64 / avg_time;
            Verdict::Validates { avg_time, rate }
        } else {
            Verdict::Fails {
                error,
                epsilon: EPSILON,
            }
        };

        Self {
            num_peers: ctx.num_peers,
            threads: parameters.threads,
            order: parameters.order,
            iterations: parameters.iterations,
            strategy: ctx.layout.strategy,
            exchange: parameters.exchange,
            compressed: parameters.compress && ctx.num_peers > 1,
            verbose: parameters.verbose,
            error,
            verdict,
        }
    }

    pub fn validates(&self) -> bool {
        matches!(self.verdict, Verdict::Validates { .. })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Parallel Research Kernels")?;
        writeln!(f, "Distributed matrix transpose: B = A^T")?;
        writeln!(f, "Number of peers      = {}", self.num_peers)?;
        writeln!(f, "Threads per peer     = {}", self.threads)?;
        writeln!(f, "Matrix order         = {}", self.order)?;
        writeln!(f, "Number of iterations = {}", self.iterations)?;
        match self.strategy {
            TransposeStrategy::Flat => writeln!(f, "Untiled")?,
            TransposeStrategy::Tiled { tile_order } => {
                writeln!(f, "Tile size            = {}", tile_order)?
            }
            TransposeStrategy::CollapsedTiled { tile_order } => {
                writeln!(f, "Tile size            = {}", tile_order)?;
                writeln!(f, "Using loop collapse")?;
            }
        }
        writeln!(f, "{}", self.exchange)?;
        if self.compressed {
            writeln!(f, "Compressed blocks")?;
        }

        match self.verdict {
            Verdict::Validates { avg_time, rate } => {
                writeln!(f, "Solution validates")?;
                if self.verbose {
                    writeln!(f, "Summed errors: {:e}", self.error)?;
                }
                write!(f, "Rate (MB/s): {:.6} Avg time (s): {:.6}", rate, avg_time)
            }
            Verdict::Fails { error, epsilon } => {
                if self.verbose {
                    writeln!(f, "Summed errors: {:e}", error)?;
                }
                write!(
                    f,
                    "ERROR: Aggregate squared error {:e} exceeds threshold {:e}",
                    error, epsilon
                )
            }
        }
    }
}
