//! NetCDF I/O: fragment reading and index writing
//!
//! - [`reader`]: loads fragment files into [`crate::field::Field`]s
//! - [`writer`]: writes the assembled index collection

pub mod reader;
pub mod writer;

pub use reader::{read_fragment, read_fragments};
pub use writer::{write_index, IndexWriter, FILL_VALUE_F64};
