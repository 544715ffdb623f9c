//! CLI Commands

pub mod group;
pub mod network;
pub mod peer;
pub mod report;
