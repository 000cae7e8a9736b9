//! External collaborator traits: pricing, tax, shipping, payment gateway.
//!
//! The core consumes these as values; computing them is out of scope.

pub mod gateway;
pub mod pricing;
pub mod shipping;
pub mod tax;
