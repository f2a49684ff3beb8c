//! Onboard - device onboarding web server
//!
//! Serves the pages an unconfigured device uses to receive WiFi credentials:
//! a captive portal while the device runs its own access point, a home page
//! once it is on a network, over a minimal single-request HTTP server with a
//! fixed pool of worker slots.

pub mod config;
pub mod device;
pub mod http;
pub mod pages;
pub mod portal;
pub mod server;
