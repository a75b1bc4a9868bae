//! Database operations for the experiment service

pub mod admins;
pub mod export;
pub mod participants;
pub mod trials;
