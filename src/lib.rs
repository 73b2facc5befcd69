//! getterlint: finds direct field reads on generated protobuf messages in
//! Go code and rewrites them into nil-safe getter calls.

// Core infrastructure - re-exported from getterlint-core
pub use getterlint_core::config;
pub use getterlint_core::diff;
pub use getterlint_core::error;
pub use getterlint_core::output;
pub use getterlint_core::patch;
pub use getterlint_core::report;

// Language front-end
pub use getterlint_go as go;

// Front door
pub mod cli;
