pub mod closest;
pub mod config;
pub mod features;
pub mod identity;
pub mod matcher;
pub mod neighbors;
pub mod outcome;
pub mod persist;
pub mod regression;
pub mod season_table;
pub mod windows;
