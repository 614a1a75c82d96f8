//! monsync Core - Domain model, ports and configuration
//!
//! This crate holds the hexagonal core shared by every other monsync crate:
//! - **Domain entities** - `MonitorRecord`, `MonitorBody`, `MonitorIdentity`,
//!   `SyncDecision`, `SyncReport`
//! - **Port definitions** - `ILocalStore`, `IRemoteGateway`, `IGatewayProvider`,
//!   `IConfirmation`
//! - **Configuration** - the YAML settings file and its validation
//!
//! # Architecture
//!
//! The domain module is pure data and rules with no I/O. Ports are traits
//! implemented by the adapter crates (`monsync-sync` for the filesystem,
//! `monsync-opensearch` for the alerting API, `monsync-cli` for the console).

pub mod config;
pub mod domain;
pub mod ports;
