mod bus;
mod types;

pub use self::bus::{MessageBus, MAX_MESSAGES_PER_TICK};
pub use self::types::{KeyId, SynthMessage};
