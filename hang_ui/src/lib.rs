#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Renderers for the core's refreshing display: a one-line terminal view and
//! a three-colour traffic light.
pub mod terminal;
pub mod traffic;

pub use terminal::TerminalRenderer;
pub use traffic::{TrafficLightRenderer, lights_for};
