pub mod layout;
pub mod writer;
