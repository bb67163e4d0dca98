//! HTTP trigger surface: router, handlers and process wiring.

pub mod app;
