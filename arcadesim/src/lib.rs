//! Real-time arcade race simulation core.
//!
//! The crate is split the same way as a classic time-discrete race simulator: `pre` reads the
//! parameter files, `core` holds the per-tick simulation (input sampling, vehicle dynamics,
//! resources, AI drivers, race control and telemetry), `post` turns a finished race into results
//! and profile records, and `interfaces` contains the data handed to the renderer and the HUD.

pub mod core;
pub mod error;
pub mod interfaces;
pub mod post;
pub mod pre;
