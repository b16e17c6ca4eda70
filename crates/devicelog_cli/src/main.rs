//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `devicelog_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("devicelog_core ping={}", devicelog_core::ping());
    println!("devicelog_core version={}", devicelog_core::core_version());
}
