use crate::comm::Communicator;
use crate::error::TransposeError;
use log::warn;

/// Combines the fault flags of all peers. Every peer gets `true` if any of them raised its flag,
/// so that they all fail together instead of waiting for a peer that gave up.
pub async fn agree_on_fault(
    comm: &mut Communicator,
    local_fault: bool,
) -> Result<bool, TransposeError> {
    let fault = comm.all_reduce_or(local_fault).await?;
    if fault && !local_fault {
        warn!("Peer {} stops because another peer reported a fault", comm.me());
    }
    Ok(fault)
}
