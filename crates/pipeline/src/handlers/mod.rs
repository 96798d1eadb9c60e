//! Standard pipeline stages.
//!
//! Default order, outermost first: [`Instrument`], [`ErrorTranslator`],
//! [`ResponseRenderer`], [`AuthorizationChecker`], [`ValidationChecker`],
//! [`OwnershipChecker`]. The order is a default; every stage only relies on
//! what it resolves itself.

mod authorization;
mod errors;
mod instrument;
mod ownership;
mod render;
mod short_circuit;
mod validate;

pub use authorization::AuthorizationChecker;
pub use errors::ErrorTranslator;
pub use instrument::Instrument;
pub use ownership::OwnershipChecker;
pub use render::ResponseRenderer;
pub use short_circuit::ShortCircuit;
pub use validate::ValidationChecker;

pub(crate) use authorization::resolve_session;
