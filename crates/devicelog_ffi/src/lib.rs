//! Mobile-facing FFI surface for the device-log core.

pub mod api;
