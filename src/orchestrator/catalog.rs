//! The fixed set of task kinds and their dependency edges.
//!
//! ```text
//! root ─┬─► Grayscale
//!       ├─► Negative
//!       ├─► Blur
//!       ├─► Sobel X ─┐
//!       ├─► Sobel Y ─┴─► Magnitude ─┐
//!       └─► Quantized ──────────────┴─► Cartoonize
//! ```

/// Display name of the root capture channel
pub const ROOT_NAME: &str = "Camera";

/// Every task the orchestrator knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Grayscale,
    Negative,
    Blur,
    GradientX,
    GradientY,
    Magnitude,
    Quantize,
    Cartoonize,
}

/// Which channels a task reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskInputs {
    /// The root capture channel
    Root,
    /// Outputs of two upstream tasks, in argument order
    Pair(TaskKind, TaskKind),
}

impl TaskKind {
    /// All kinds, upstream before downstream
    pub const ALL: [TaskKind; 8] = [
        TaskKind::Grayscale,
        TaskKind::Negative,
        TaskKind::Blur,
        TaskKind::GradientX,
        TaskKind::GradientY,
        TaskKind::Quantize,
        TaskKind::Magnitude,
        TaskKind::Cartoonize,
    ];

    /// Registry key and window title
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Grayscale => "Grayscale",
            TaskKind::Negative => "Negative",
            TaskKind::Blur => "Blur",
            TaskKind::GradientX => "Sobel X",
            TaskKind::GradientY => "Sobel Y",
            TaskKind::Magnitude => "Magnitude",
            TaskKind::Quantize => "Quantized",
            TaskKind::Cartoonize => "Cartoonize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn inputs(self) -> TaskInputs {
        match self {
            TaskKind::Magnitude => TaskInputs::Pair(TaskKind::GradientX, TaskKind::GradientY),
            TaskKind::Cartoonize => TaskInputs::Pair(TaskKind::Quantize, TaskKind::Magnitude),
            _ => TaskInputs::Root,
        }
    }

    /// True if `self` reads `upstream`'s output directly
    pub fn reads_from(self, upstream: TaskKind) -> bool {
        match self.inputs() {
            TaskInputs::Root => false,
            TaskInputs::Pair(a, b) => a == upstream || b == upstream,
        }
    }

    /// Position in [`TaskKind::ALL`]; upstream kinds sort first
    pub fn rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::ALL.len())
    }
}
