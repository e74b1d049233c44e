pub mod actor;

pub use actor::{ActorArchetype, ActorRow, ActorState, PersistentFlags, ScratchFlags};
