//! Binary module codec.
//!
//! ```text
//! "NeCo" 0x00 major minor patch
//! "CNST" strings ints floats
//! "CODE" metadata globals function-table function-bodies
//! ```
//!
//! Every segment is a 3-byte big-endian length followed by its payload.

mod compact;
mod reader;
mod writer;

pub use compact::{compact, is_compact};
pub use reader::decode;
pub use writer::encode;

pub const MAGIC: [u8; 4] = *b"NeCo";
/// major, minor, patch
pub const VERSION: [u8; 3] = [1, 0, 0];
pub const CONSTANTS_TAG: [u8; 4] = *b"CNST";
pub const CODE_TAG: [u8; 4] = *b"CODE";
/// Largest payload a 3-byte length can describe.
pub const MAX_SEGMENT_LEN: usize = 0xFF_FFFF;
