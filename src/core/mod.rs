pub mod checkpoint;
pub mod etl;
pub mod extractor;
pub mod fetcher;
pub mod grouper;
pub mod markup;
pub mod pipeline;

pub use crate::domain::model::{ApplicantRecord, RowGroup, ScrapeSummary, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
