pub mod classifier;
pub mod form_model;
pub mod label;
pub mod scanner;
pub mod selector;
