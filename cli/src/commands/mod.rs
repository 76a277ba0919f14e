pub mod bench;
pub mod catalog;
pub mod classify;
pub mod rules;
pub mod schema;
