//! Conversion Pipeline
//!
//! Format negotiation, interruption-aware pause/resume, write outcome
//! classification and the streaming loop, tied together by [`ConversionJob`].

pub mod buffer;
pub mod classifier;
pub mod interruption;
pub mod job;
pub mod negotiator;
pub mod pipeline;
pub mod signal;

pub use buffer::{BufferPool, DEFAULT_BUFFER_BYTE_SIZE};
pub use classifier::{Classification, ErrorClassifier};
pub use interruption::{ConversionState, InterruptionController, SessionActivator};
pub use job::{ConversionJob, ConversionJobBuilder, ConversionObserver, ConversionOutcome, ConversionRequest};
pub use negotiator::{FormatNegotiator, NegotiatedFormats};
pub use pipeline::{ConversionLoop, LoopPhase, LoopReport, StreamPosition};
pub use signal::{InterruptionCenter, InterruptionEvent, Registration};
