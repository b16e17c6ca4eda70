//! Use-case services exposed to external collaborators.

pub mod device_log;

pub use device_log::DeviceLogService;
