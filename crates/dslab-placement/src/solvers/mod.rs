//! Solver backend implementations.

pub mod microlp_solver;
