//! Governance: the bootstrap window, the process-scoped kill switch,
//! and the addendum contract consumed by the external prompt assembler.

mod addendum;
mod gate;

pub use addendum::AddendumAssembler;
pub use gate::GovernanceGate;
