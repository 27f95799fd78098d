pub mod context;
pub mod probe;
pub mod report;

pub use context::ExecutionContext;
pub use probe::{PathCommands, ToolProbe};
pub use report::{DetectionReport, DetectionResult, InstallMethod};
