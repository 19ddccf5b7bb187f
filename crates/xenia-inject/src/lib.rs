pub mod poller;
pub mod tick;

pub use poller::{Injector, InjectorConfig, PollHandle};
pub use tick::try_inject;
