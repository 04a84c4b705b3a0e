//! Input-fusion and motion-integration engine for an OSC-driven camera drone
//!
//! UI joysticks and a game controller are fused into one input frame per
//! tick, integrated into an absolute six-axis pose and streamed over OSC/UDP.
//! A background receiver mirrors the remote camera pose back when nothing
//! local is driving it.
//!
//! ```text
//! UI ──► EngineHandle ──┐
//!                       ├─► Engine tick ──► OSC 127.0.0.1:9000
//! gilrs ──► Arbiter ────┘        ▲
//!                                └── OSC 0.0.0.0:9001
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod input;
pub mod motion;
pub mod pose;
pub mod transport;
