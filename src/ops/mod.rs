//! Operator tasks behind the `smartlearn-admin` binary.

pub mod cluster;
pub mod seed;
