use tracing::warn;
use xenia_core::TickOutcome;
use xenia_dom::Document;

use crate::poller::InjectorConfig;

/// One poll tick: look the target up fresh, honor the idempotency guard,
/// and perform the single content replacement. Runs to completion
/// synchronously; absence of the target is the normal "not ready yet"
/// outcome.
pub fn try_inject(document: &dyn Document, config: &InjectorConfig) -> TickOutcome {
    let Some(target) = document.find_by_class(&config.target) else {
        return TickOutcome::TargetMissing;
    };
    if document
        .find_child_by_class(target, &config.marker)
        .is_some()
    {
        return TickOutcome::AlreadyMarked;
    }
    match document.replace_content(target, &config.fragment) {
        Ok(_) => TickOutcome::Injected,
        Err(e) => {
            warn!(target, error = %e, "target vanished during replacement, will retry");
            TickOutcome::TargetMissing
        }
    }
}
