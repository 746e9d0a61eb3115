//! Periodic webcam sampling against a remote age/gender/emotion backend.
//!
//! A [`pipeline::session::WebcamSession`] owns the camera for its lifetime,
//! samples a frame on every tick, and publishes the backend's answer (or the
//! failure) into a [`view::view_state::ViewStore`] that renderers read from.

pub mod analysis;
pub mod capture;
pub mod encoding;
pub mod pipeline;
pub mod shared;
pub mod view;
