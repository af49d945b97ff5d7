pub mod clientstate;
pub mod store;
