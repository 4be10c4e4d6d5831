pub mod delay;
pub mod filler;
