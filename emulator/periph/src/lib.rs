/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the HFRP mailbox emulator peripheral library.

--*/

mod hfrp_fw;
mod hfrp_mbox;

pub use hfrp_fw::{CommandHandler, DefaultCommandHandler, HfrpFirmware, HfrpFirmwareThread};
pub use hfrp_mbox::HfrpMailboxWindow;
