//! Type-safe argument structs for the external tools.
//!
//! Each struct implements `ToolArgs` and maps its fields to the exact flags
//! the tool expects. Parsers for the tools whose output we depend on live
//! next to their argument structs.

pub mod authselect;
pub mod boot;
pub mod fido2;
pub mod packages;
