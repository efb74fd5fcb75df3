//! orgsync command line library
//!
//! Configuration, directory and catalog clients, output rendering and the
//! command orchestrators behind the `orgsync` binary.

pub mod clients;
pub mod config;
pub mod error;
pub mod orchestrators;
pub mod output;
pub mod paths;
pub mod terminal;
