//! HTTP value types for the Switchyard controller layer.
//!
//! [`Request`] and [`Response`] are plain data carriers built on `hyper`'s
//! type vocabulary; [`Session`] is the opaque store the session layer hands
//! to a dispatch. The framework-wide [`Error`]/[`Result`] pair also lives
//! here so every crate shares one error surface.

pub mod error;
pub mod request;
pub mod response;
pub mod session;

pub use error::{Error, Result};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use session::Session;
