pub mod coordinator;
pub mod protocol;
