mod comm;
mod context;
mod error;
mod exchange;
mod fault;
mod layout;
mod local_transport;
mod mailbox;
mod messages;
mod network_transport;
mod peer;
mod report;
mod storage;
mod timer;
mod transposer;
mod validator;
mod view;

pub use crate::comm::{Communicator, Transport};
pub use crate::context::RunContext;
pub use crate::error::TransposeError;
pub use crate::exchange::{BlockingExchange, Exchange, ExchangeScheduler, OverlappedExchange};
pub use crate::fault::agree_on_fault;
pub use crate::layout::{MatrixLayout, TransposeStrategy};
pub use crate::local_transport::{local_mesh, LocalTransport};
pub use crate::messages::{CollectivePayload, PeerMessage, Tag};
pub use crate::network_transport::{NetworkTransport, PeerMessageHandler};
pub use crate::peer::{run, Benchmark};
pub use crate::report::{Report, Verdict};
pub use crate::storage::{ColumnBlock, Matrices, Workspace};
pub use crate::timer::IterationTimer;
pub use crate::transposer::{
    transposer_for, CollapsedTiledTranspose, FlatTranspose, LocalTranspose, TiledTranspose,
};
pub use crate::validator::local_error;
pub use crate::view::{StridedView, StridedViewMut, Tile};
