//! Device-log sink: line rendering, the append-only writer and the size
//! guard.

mod clock;
mod writer;

pub use clock::{Clock, SystemClock};
pub use writer::{render_line, LogWriter};
