#![doc = include_str!("../readme.md")]

pub mod assembler;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod decision;
pub mod error;
pub mod feasibility;
pub mod interpreter;
pub mod objective;
pub mod optimizer;
pub mod program;
pub mod request;
pub mod selector;
pub mod solver;
pub mod solvers;
