//! Command-line front end for the robust value iteration engine.

pub mod cli;
