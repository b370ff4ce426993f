//! HTTP plumbing: transport, retry policy and the resilient JSON client.

pub mod client;
pub mod retry;
pub mod transport;

pub use client::ResilientClient;
pub use retry::{RetryPolicy, RetryState, Sleeper, TokioSleeper};
pub use transport::{
    ApiRequest, ApiResponse, ReqwestTransport, ReqwestTransportBuilder, Transport, TransportError,
};
