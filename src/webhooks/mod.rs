pub mod event;
pub mod processor;

pub use event::{WebhookEvent, WebhookOutcome};
pub use processor::WebhookProcessor;
