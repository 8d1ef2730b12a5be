pub mod abort;
pub mod catalog;
pub mod config;
pub mod handover;
pub mod observer;
pub mod orbit;
pub mod pipeline;
pub mod pool;
pub mod visibility;
