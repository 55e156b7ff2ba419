pub mod hyperparameters;
pub mod plugin;
pub mod runner;
