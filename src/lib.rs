//! Dispatch Hub - real-time connection routing for ride dispatch
//!
//! Drivers and customers hold WebSocket connections to the hub. The hub
//! tracks who is reachable by role, identity and order, then relays new
//! orders to drivers and driver positions to the customers tracking them.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
