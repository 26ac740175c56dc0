// Core modules implementing execution, session policy, rendering, and persistence.
pub mod error;
pub mod exec;
pub mod persist;
pub mod sanitize;
pub mod session;
pub mod transcript;
