pub mod responses;
pub mod settings;
pub mod store;
