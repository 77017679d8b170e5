// src/lib.rs
// Library root of LlamaNest; the binary in main.rs only wires up logging and the window.

pub mod app;
