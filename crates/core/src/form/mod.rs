mod answers;
mod machine;
mod session;

pub use answers::Answers;
pub use machine::{Effect, Event, Transition, TransitionRejected};
pub use session::{FormSession, FormState};
