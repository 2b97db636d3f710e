// Licensed under the Apache-2.0 license

//! Command indices and response payloads understood by the simulated
//! firmware.
//!
//! The transport itself is agnostic to these; they give the host and the
//! emulator something concrete to exchange.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::HFRP_MAX_INDEX_OR_STATUS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandIndex(pub u16);

impl CommandIndex {
    /// Returns the command payload unchanged.
    pub const ECHO: Self = Self(0x001);
    /// Returns a [`FwVersionResp`].
    pub const GET_FW_VERSION: Self = Self(0x002);
    /// Returns the number of commands served since the last reset as a
    /// little-endian `u32`.
    pub const GET_COMMAND_COUNT: Self = Self(0x003);
}

impl From<u16> for CommandIndex {
    fn from(value: u16) -> Self {
        Self(value & HFRP_MAX_INDEX_OR_STATUS)
    }
}

impl From<CommandIndex> for u16 {
    fn from(value: CommandIndex) -> Self {
        value.0
    }
}

pub const HFRP_RSP_STATUS_SUCCESS: u16 = 0x000;
pub const HFRP_RSP_STATUS_INVALID_PARAM: u16 = 0x001;
pub const HFRP_RSP_STATUS_UNSUPPORTED: u16 = 0x3FF;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FwVersionResp {
    pub major: u16,
    pub minor: u16,
    pub build: u32,
}
