// File I/O operations

pub mod model_file;
pub mod pointcloud;
pub mod report;

pub use model_file::{load_model, save_model, save_updated_model};
pub use pointcloud::{discover_scans, read_cloud, read_points};
pub use report::{write_report, write_report_file};
