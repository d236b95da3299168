//! Router integration tests
//!
//! Dispatch semantics and correlation helpers, driven through a running
//! runtime and an in-process backend.
