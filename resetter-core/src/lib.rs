#![no_std]

#[cfg(test)]
use critical_section as _;

// Shared logic for the DFAM resetter.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware access goes through the traits in `emitter`,
// and the interrupt-side pulse record lives in `recorder`.

pub mod alignment;
pub mod bench;
pub mod config;
pub mod controller;
pub mod emitter;
pub mod history;
pub mod limiter;
pub mod recorder;
pub mod script;
pub mod time;
