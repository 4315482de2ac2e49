use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (non-positive tolerance, bad sweep bounds, etc.).
    ConfigValidation(String),
    /// A segmented point-cloud file produced no usable points.
    EmptyPointSet { name: String },
    /// Region-of-interest mode was requested without a region.
    MissingRegion,
    /// The model store has no element with this id.
    UnknownElement(String),
    /// An element references a floor the store does not know.
    UnknownFloor(String),
    /// A clone would reuse an id already present in the store.
    DuplicateElement(String),
    /// Model document could not be decoded or encoded.
    ModelFormat(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyPointSet { name } => write!(f, "scan '{name}': no usable points"),
            Self::MissingRegion => {
                write!(f, "region_of_interest mode requires a region scan")
            }
            Self::UnknownElement(id) => write!(f, "unknown element: {id}"),
            Self::UnknownFloor(id) => write!(f, "unknown floor: {id}"),
            Self::DuplicateElement(id) => write!(f, "element id already exists: {id}"),
            Self::ModelFormat(msg) => write!(f, "model format error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
