//! Telemetry for input elements dropped by the pipeline.
//!
//! Malformed wards and reports are never fatal: each one is excluded from
//! its pass and described to a [`DropSink`]. The sink decouples drop
//! reporting from any particular backend (log lines, counters in tests,
//! CLI summaries).

use std::sync::{Mutex, PoisonError};

use strum_macros::{AsRefStr, Display};

/// Which kind of input element was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    /// A ward boundary feature.
    Ward,
    /// A citizen report.
    Report,
}

/// Why an element was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The feature has no geometry, or the geometry is `null`.
    MissingGeometry,
    /// The geometry type cannot describe a ward boundary.
    UnsupportedGeometry {
        /// The geometry `type` that was found.
        kind: String,
    },
    /// The geometry has no boundary ring.
    MissingRing,
    /// The boundary ring has no positions.
    EmptyRing,
    /// The ring has fewer than three positions.
    TooFewVertices {
        /// Number of positions in the ring.
        count: usize,
    },
    /// A ring position is not a pair of finite numbers.
    InvalidCoordinate {
        /// Position of the offending vertex in the ring.
        vertex: usize,
    },
    /// A report's position is not a finite coordinate.
    NonFinitePosition,
    /// The element could not be decoded at all.
    Malformed {
        /// Decoder message.
        message: String,
    },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingGeometry => write!(f, "missing geometry"),
            Self::UnsupportedGeometry { kind } => write!(f, "unsupported geometry type {kind}"),
            Self::MissingRing => write!(f, "geometry has no boundary ring"),
            Self::EmptyRing => write!(f, "boundary ring is empty"),
            Self::TooFewVertices { count } => {
                write!(f, "boundary ring has {count} vertices, need at least 3")
            }
            Self::InvalidCoordinate { vertex } => {
                write!(f, "vertex {vertex} is not a finite [lng, lat] pair")
            }
            Self::NonFinitePosition => write!(f, "position is not a finite coordinate"),
            Self::Malformed { message } => write!(f, "malformed element: {message}"),
        }
    }
}

/// One dropped input element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedElement {
    /// Kind of element.
    pub kind: ElementKind,
    /// Position of the element in its input sequence.
    pub index: usize,
    /// Why it was dropped.
    pub reason: DropReason,
}

/// Receives a notification for every dropped input element.
///
/// Implementations must be `Send + Sync` so a single sink can observe
/// passes running on several threads.
pub trait DropSink: Send + Sync {
    /// Called once per dropped element.
    fn dropped(&self, element: &DroppedElement);
}

/// Ignores all drops.
pub struct NullSink;

impl DropSink for NullSink {
    fn dropped(&self, _element: &DroppedElement) {}
}

/// Records every drop for later inspection.
#[derive(Default)]
pub struct CountingSink {
    drops: Mutex<Vec<DroppedElement>>,
}

impl CountingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drops of the given kind.
    #[must_use]
    pub fn count(&self, kind: ElementKind) -> usize {
        self.drops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    /// All recorded drops, in the order they were reported.
    #[must_use]
    pub fn drops(&self) -> Vec<DroppedElement> {
        self.drops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DropSink for CountingSink {
    fn dropped(&self, element: &DroppedElement) {
        self.drops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(element.clone());
    }
}
