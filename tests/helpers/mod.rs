#![allow(dead_code)]

pub mod builders;
pub mod store;

pub use builders::ConfigBuilder;
pub use store::TestStore;
