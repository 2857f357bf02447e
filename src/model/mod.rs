//! Data types, plus the logic that decides what gets stored.

pub mod api;
pub mod common;
pub mod db;
pub mod export;
pub mod mongodb;
pub mod stats;
pub mod submission;
