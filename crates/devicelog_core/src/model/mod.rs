//! Domain types shared by the sink, crash and service layers.

pub mod crash;
pub mod event;
