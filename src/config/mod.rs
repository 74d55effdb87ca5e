//! Configuration files of the command-line tools.

pub mod track_demo;
