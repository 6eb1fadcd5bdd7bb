pub mod config_io;
pub mod gateway;
pub mod overlay;
pub mod slot_store;
