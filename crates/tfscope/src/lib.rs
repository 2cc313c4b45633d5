//! Resolve the local module tree of a Terraform root module and check it
//! against a set of changed files.

pub mod affected;
pub mod cli;
pub mod logger;
pub mod module_graph;
pub mod normalize;
