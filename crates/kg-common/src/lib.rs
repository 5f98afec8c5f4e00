//! Shared infrastructure for Keygate binaries.
//!
//! Today this is just the logging bootstrap; anything needed by more than
//! one binary and not tied to the identity domain belongs here.

pub mod logging;
