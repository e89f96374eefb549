//! Animated neural network backdrop: glowing nodes drifting around fixed
//! anchors, short-lived links between near neighbours, and pulses travelling
//! along those links.

pub mod app;
pub mod color;
pub mod config;
pub mod driver;
pub mod error;
pub mod render;
pub mod sim;
pub mod util;
