// Library for tests to access modules

pub mod aggregation;
pub mod collector;
pub mod config;
pub mod history_log;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod render;
pub mod report;
pub mod version;
