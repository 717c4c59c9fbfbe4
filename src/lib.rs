#![crate_name = "lingoc"]

#[macro_use]
extern crate lazy_static;

pub mod lingo_compiler;
