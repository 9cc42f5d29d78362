//! tagged-export library
//!
//! Text description parsing, buffer dumps and manifest builds for the tagged
//! block format. The `tagged-export` binary is a thin CLI over these.

pub mod convert;
pub mod dump;
pub mod manifest;
pub mod text;

pub use convert::{convert_file, convert_str, dump_file};
pub use dump::dump;
pub use text::{ParseError, parse};
