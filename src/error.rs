use thiserror::Error;

pub type Result<T> = std::result::Result<T, EliminateError>;

/// Fatal error kinds. Per-feature conditions (missing geometry, no touching
/// neighbor, unresolvable cycle, failed write) are logged as warnings and
/// never surface here.
#[derive(Debug, Error)]
pub enum EliminateError {
    // Configuration
    #[error("no victim specification: provide a filter expression or a feature-id list")]
    NoVictimsSpecified,
    #[error("conflicting victim specification: a filter expression and a feature-id list are mutually exclusive")]
    ConflictingVictimSpec,
    #[error("minimum area must be greater than zero, got {0}")]
    InvalidMinArea(f64),
    #[error("no vector driver matches '{0}'")]
    UnknownDriver(String),

    // Source dataset
    #[error("a source layer name is required, the dataset has {0} layers")]
    AmbiguousLayer(usize),
    #[error("source layer '{0}' has no geometry column")]
    MissingGeometryColumn(String),
    #[error("source layer '{0}' has {1} geometry columns, only one is supported")]
    MultipleGeometryColumns(String, usize),
    #[error("attribute filter rejected by the source layer: {0}")]
    InvalidFilter(#[source] gdal::errors::GdalError),

    // Destination dataset
    #[error("failed to create destination layer '{name}': {source}")]
    CreateLayerFailed {
        name: String,
        #[source]
        source: gdal::errors::GdalError,
    },
    #[error("failed to create field '{name}' on the destination layer: {source}")]
    CreateFieldFailed {
        name: String,
        #[source]
        source: gdal::errors::GdalError,
    },

    #[error(transparent)]
    Gdal(#[from] gdal::errors::GdalError),
}
