//! request_executor component
//!
//! The request execution engine: resolves a declarative request against
//! layered client defaults into a wire plan, performs it through the pooled
//! transport, drives redirects, cookies, credentials and timeouts, and
//! returns a buffered `Response` or a lazy `StreamingResponse`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod config;
mod executor;
mod plan;
mod response;

pub use config::{ClientConfig, PROXY_ENV_VAR};
pub use executor::Executor;
pub use plan::{resolve, RequestPlan};
pub use response::{Response, StreamingResponse};
