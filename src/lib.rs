//! Silent Guardian - background spending nudges near danger zones

pub mod api;
pub mod constants;
pub mod logic;
