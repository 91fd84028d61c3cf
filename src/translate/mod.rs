//! Translation between the client-facing chat completions shape and NIM's.
//!
//! Model resolution, parameter defaults and response reshaping live here.
//! All translation functions are pure (no I/O).

pub mod request;
pub mod response;
pub mod types;
