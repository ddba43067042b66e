pub mod config;
pub mod route;
pub mod simulate;
pub mod variant;
