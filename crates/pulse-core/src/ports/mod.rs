//! Ports: the black-box collaborators the adapter layer consumes.

pub mod change;
pub mod clock;
pub mod logger;
pub mod semantic;
pub mod store;

pub use change::{ChangeChannel, StoreChange};
pub use clock::{parse_timestamp, relative_to, Clock, ManualClock, SystemClock};
pub use logger::{LogContext, LogEntry, LogLevel, RecordingLogger, StructuredLogger, TracingLogger};
pub use semantic::{HttpSemanticService, SemanticConfidence};
pub use store::{KeyValueStore, MemoryStore, SledStore, StoreExt};
