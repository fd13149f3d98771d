mod listener;
mod sse;

pub use listener::{ProgressListener, StreamEvent};
