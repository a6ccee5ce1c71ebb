#![forbid(unsafe_code)]

//! Core: time sources, cooperative task scheduling, and logging shims.

pub mod clock;
pub mod logging;
pub mod scheduler;
