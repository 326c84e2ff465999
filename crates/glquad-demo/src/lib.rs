//! The "hello quad" demo: a single indexed quad tinted by a time-varying uniform.

pub mod scene;
