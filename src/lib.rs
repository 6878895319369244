//! # ash-rpc-router
//!
//! Server-side JSON-RPC 2.0 dispatch core.
//!
//! ## Features
//!
//! - **Single, notification and batch handling** - Batches run concurrently and keep input order
//! - **Before/after hooks** - Per-method hooks, including concurrent hook groups
//! - **Protocol validation** - Version and method checks with standard error codes
//! - **Panic containment** - A panicking handler or hook becomes an internal error
//! - **Error callback and sanitization** - Observe raw failures, rewrite what clients see
//! - **Request context** - Any cloneable value passed through to handlers and hooks
//!
//! The crate is transport-agnostic: feed it a decoded JSON body and send back
//! whatever [`Reply::into_value`] returns. Dispatch spawns tasks, so it must
//! run inside a tokio runtime.
//!
//! ## Quick Start
//!
//! ```rust
//! use ash_rpc_router::*;
//! use serde_json::{Value, json};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let router = Router::builder()
//!         .method("ping", |_params: Value, _ctx: ()| async move { Ok(json!("pong")) })
//!         .before(
//!             "ping",
//!             Hook::single(|_params: Value, _result: Option<Value>, _ctx: ()| async move { Ok(()) }),
//!         )
//!         .on_error(|error: &Error, call: &Call| {
//!             eprintln!("{:?} failed: {}", call.method_name(), error);
//!         })
//!         .build()
//!         .expect("valid router");
//!
//!     let reply = router
//!         .handle(json!({"jsonrpc": "2.0", "method": "ping", "id": 1}), ())
//!         .await
//!         .expect("object body");
//!     assert_eq!(
//!         reply.into_value(),
//!         Some(json!({"jsonrpc": "2.0", "result": "pong", "id": 1}))
//!     );
//! }
//! ```

pub mod builders;
pub mod config;
pub mod hooks;
pub mod macros;
pub mod router;
pub mod sanitization;
pub mod traits;
pub mod types;
pub mod validation;

pub use builders::*;
pub use config::*;
pub use hooks::*;
pub use router::*;
pub use traits::*;
pub use types::*;

pub use async_trait;

#[doc(hidden)]
pub use serde_json;
