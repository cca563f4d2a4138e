// Status Change Notification Engine.
// feed → diff → composer, driven per subscription by engine; alerts and the
// SSE handler are the presentation side.

pub mod alerts;
pub mod composer;
pub mod diff;
pub mod engine;
pub mod feed;
pub mod handlers;
pub mod index;
pub mod reconciler;
pub mod strategy;
