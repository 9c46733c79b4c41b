//! Synchronous client SDK for a CoprHD-style storage controller REST API.
//!
//! # Overview
//! A `Client` carries the connection configuration and a `Transport`.
//! Accessors obtained from it (`export()`, `group()`) are configured with
//! chained `with_*` setters and finished with a terminal call such as
//! `create`, `query`, `search` or `delete`. Mutating calls return a
//! controller task, which is awaited through `TaskTracker` before the
//! resulting resource is fetched.
//!
//! # Design
//! - Every factory call copies the client, so accessors never share builder
//!   state; a single accessor is meant for a single call chain.
//! - Requests and responses are plain data (`http` module); the transport is
//!   the only component that touches the network.
//! - Task polling reads time through a `Clock`, which tests replace.
//!
//! ```no_run
//! use coprhd_core::{Client, ClientConfig};
//!
//! let client = Client::from_config(ClientConfig::new("https://controller:4443").with_token("t"));
//! let export = client
//!     .export()
//!     .with_project("proj1")
//!     .with_array("varray1")
//!     .with_volumes(["vol-1"])
//!     .create("exp1")?;
//! println!("{}", export.id());
//! # Ok::<(), coprhd_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod group;
pub mod http;
pub mod task;
pub mod transport;
pub mod types;
pub mod urn;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, Result, ServiceError, ERR_CODE_EXPORT_VOLUME_DUP};
pub use export::ExportAccessor;
pub use group::GroupAccessor;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use task::{Clock, SystemClock, Task, TaskState, TaskTracker};
pub use transport::{Transport, UreqTransport};
pub use types::{
    BaseObject, CreateExportRequest, Export, ExportType, Group, Initiator, Link, NamedResource,
    ResourceId, SearchResource, SearchResults,
};
pub use urn::is_well_formed_id;
