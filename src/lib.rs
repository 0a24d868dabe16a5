pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod pdf;
pub mod pipeline;
pub mod prompts;
pub mod protocol;
pub mod selectors;
pub mod session;
pub mod storage;
pub mod summary;
