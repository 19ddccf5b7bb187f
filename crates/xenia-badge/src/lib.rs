pub mod html;

pub use html::{
    contains_class, find_class_element, inject_badge, inject_watermark_badge, BadgeOutcome,
    ElementSpan,
};
