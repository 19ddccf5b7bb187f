pub mod error;
pub mod types;

pub use error::{XeniaError, XeniaResult};
pub use types::{
    ClassSelector, Fragment, InjectionReport, InjectorPhase, TickOutcome, BADGE_CLASS, BADGE_TEXT,
    DEFAULT_POLL_INTERVAL_MS, WATERMARK_CLASS,
};
