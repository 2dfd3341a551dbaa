// src/scenes/mod.rs

pub mod studying;
