// src/models/mod.rs

pub mod post;
pub mod user;
pub mod vote;
