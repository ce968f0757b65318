//! Engine state: annotation store, interaction machine and session.

mod interaction;
mod session;
mod store;

pub use interaction::{Gesture, InteractionMachine, InteractionOutcome, PointerEvent, Tool};
pub use session::{AssistOp, Session, SessionError};
pub use store::{AnnotationStore, StoreError};
