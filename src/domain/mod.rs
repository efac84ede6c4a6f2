mod model;

pub use model::{BatchJob, BatchResult, DownloadItem, FormatChoice, ItemFailure, PlaylistInfo};
