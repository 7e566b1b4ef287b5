//! Shared plumbing for the `appmgr` and `appmgr-launch` binaries.

pub mod session;
