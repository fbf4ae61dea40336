// Core modules: the registry engine, its value model, and the facades built on it.
pub mod config;
pub mod credentials;
pub mod env;
pub mod error;
pub mod registry;
pub mod value;
