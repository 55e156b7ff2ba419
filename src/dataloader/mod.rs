pub mod batch;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod dataloader;
pub mod epoch;
pub mod error;
pub mod generator;
pub mod info;
pub mod loader;
pub mod manifest;
pub mod par_iter;
