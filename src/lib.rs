pub mod api;
pub mod atom;
pub mod boxes;
pub mod detach;
pub mod durations;
pub mod error;
pub mod known_boxes;
pub mod parser;
pub mod retime;
pub mod sequence;
pub mod storage;
pub mod stream;
pub mod timing;
pub mod util;
pub mod writer;

pub use api::{AtomSummary, analyze_file, summarize};
pub use atom::Atom;
pub use boxes::{BoxHeader, FourCC};
pub use error::{Error, Result};
pub use known_boxes::{AtomKind, KnownBox};
pub use parser::{TopLevelAtom, decode_header, encode_header, parse_file, top_level};
pub use storage::{ReadSeek, Source, Storage, Window};
pub use stream::Lines;
