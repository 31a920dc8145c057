//! Signature generation collaborator for the attendance kiosk.
//!
//! The kiosk never looks at pixels. A [`SignatureGenerator`] reduces a
//! captured image to a [`Signature`]: a float embedding or a hex hash.
//! [`HttpGenerator`] reaches a remote generator over HTTP.

pub mod error;
pub mod generator;
pub mod http;

pub use error::SignatureError;
pub use generator::{Signature, SignatureGenerator};
pub use http::{GeneratorConfig, HttpGenerator};
