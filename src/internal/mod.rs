//! Internal implementation modules.
//!
//! Raw structure decoding shared by the public readers. Not part of the
//! public API.

pub(crate) mod pe_header;
pub(crate) mod version_info;
