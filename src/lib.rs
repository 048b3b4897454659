// src/lib.rs

pub mod config;
pub mod data;
pub mod geo;
pub mod load;
pub mod refresh;
pub mod render;
pub mod serve;
pub mod snapshot;
pub mod view;
