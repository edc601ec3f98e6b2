#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod bootstrap;
pub mod config;
pub mod contrast;
pub mod data;
pub mod error;
pub mod event_table;
pub mod grid;
pub mod interval;
pub mod mcc;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod risk_set;
pub mod survival;
pub mod totals;
pub mod types;
