/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Library interface for the HFRP mailbox emulator.

--*/

pub mod config;
pub mod runner;

pub use config::HfrpFileConfig;
pub use runner::{run, EmulatorArgs, RunSummary};
