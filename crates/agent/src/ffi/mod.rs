//! C ABI of the agent

pub mod exports;

pub use exports::HostCallbacks;
