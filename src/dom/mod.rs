pub mod document;
pub mod page;
pub mod query;
