//! Structural validation of trackwire envelopes.
//!
//! Incoming JSON is checked against an embedded JSON Schema 2020-12 document
//! before it is converted into typed [`Envelope`](trackwire_message::Envelope)
//! values. Failures carry the JSON pointer of the offending member so that
//! a peer can be told precisely what was wrong.
//!
//! Only structure is checked here. Semantically odd but well-formed values,
//! such as negative track ids, pass.

pub mod config;
pub mod error;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{Result, SchemaError};
pub use validator::{EnvelopeValidator, ENVELOPE_SCHEMA};
