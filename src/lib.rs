pub mod breaking;
pub mod check;
pub mod config;
pub mod dependency;
pub mod filter;
pub mod plan;
pub mod version;
