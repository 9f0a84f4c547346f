//! Outcome resolution: verify a prediction, record the outcome, and
//! fold its statistical deltas into the owning domain's mood state.

mod deltas;
mod resolver;
mod state;

pub use deltas::OutcomeDeltas;
pub use resolver::{OutcomeResolver, ResolveRequest};
pub use state::{accuracy_trend, population_volatility};
