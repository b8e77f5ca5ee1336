pub mod catalog;
pub mod character;
pub mod completion;
pub mod config;
pub mod errors;
pub mod gates;
pub mod progress;
pub mod quiz;
pub mod runner;
pub mod sequencer;
pub mod session;
pub mod stage;
pub mod storage;
pub mod ui;
