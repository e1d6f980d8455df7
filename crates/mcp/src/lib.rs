//! Core of a line-delimited JSON-RPC tool server.
//!
//! The crate is split along the path a request takes:
//!
//! - [`transport`]: newline framing over any `AsyncRead` / `AsyncWrite` pair
//!   (stdin/stdout in production).
//! - [`protocol`]: request and response envelopes.
//! - [`registry`]: the frozen table of tools and resources, built once at
//!   startup through [`Registry::builder`].
//! - [`dispatch`]: turns one decoded request into at most one response.
//! - [`server`]: the read loop tying it together, with bounded concurrency
//!   and request-ordered output.
//!
//! Handlers never touch stdout. They receive their typed parameters and the
//! injected [`Session`], and return a JSON value.
//!
//! ```rust,ignore
//! use pcmcp::{Dispatcher, Registry, Server, ServerInfo, Session};
//! use std::sync::Arc;
//!
//! let registry = Registry::builder().tool(MyTool)?.build();
//! let info = ServerInfo::new("demo", "0.1.0");
//! let dispatcher = Dispatcher::new(registry, info, Arc::new(Session::default()));
//! let (stdin, stdout) = pcmcp::transport::stdio();
//! Server::new(dispatcher)
//!     .serve(stdin, stdout, pcmcp::server::shutdown_signal())
//!     .await?;
//! ```

pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
pub mod session;
pub mod transport;
pub mod uri;

pub use dispatch::{Dispatcher, ServerInfo};
pub use error::{DispatchError, InvalidParams, RegistryError, ServeError};
pub use protocol::{ErrorObject, Outcome, Request, Response};
pub use registry::{Registry, RegistryBuilder, Resource, Tool};
pub use server::Server;
pub use session::{Session, Token};
