//! Custom Resource Definitions for Alfa Controllr

mod controllr;

pub use controllr::{AlfaControllr, AlfaControllrSpec, CoreSelector, CrdRef};
