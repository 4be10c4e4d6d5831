pub mod profile_model;
pub mod resolver;
pub mod validation;
