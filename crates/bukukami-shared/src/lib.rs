//! Types shared by every BukuKami crate: constants, the error taxonomy, the
//! domain records, the transport-neutral HTTP model and the worker protocol.

pub mod constants;
pub mod error;
pub mod http;
pub mod protocol;
pub mod types;

pub use error::{AppError, Permission, TransportError};
