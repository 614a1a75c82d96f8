//! Port definitions (hexagonal architecture interfaces)
//!
//! ## Ports Overview
//!
//! - [`ILocalStore`] - the on-disk monitor tree of one instance
//! - [`IRemoteGateway`] - the alerting API of one instance
//! - [`IGatewayProvider`] - opens a gateway for a configured instance
//! - [`IConfirmation`] - operator approval of planned decisions

pub mod confirmation;
pub mod local_store;
pub mod remote_gateway;

pub use confirmation::{ApproveAll, ApproveNone, IConfirmation};
pub use local_store::{ILocalStore, LoadFailure, LocalSnapshot};
pub use remote_gateway::{Credentials, GatewayError, GatewayErrorKind, IGatewayProvider, IRemoteGateway};
