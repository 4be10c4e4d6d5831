pub mod logger;
pub mod overlay;
pub mod trace;
