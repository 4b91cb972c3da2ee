#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod data_processor;
pub mod distance;
pub mod error;
pub mod sample_corpus;
pub mod traits;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
