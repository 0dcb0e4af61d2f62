pub mod codec;
pub mod handler;
mod service;
pub mod storage;
mod types;

pub use codec::{InputFormat, JpegOptions, convert_to_jpeg};
pub use handler::create_convert_router;
pub use service::ConvertService;
pub use storage::UploadStore;
pub use types::{ConvertUpload, ConvertedFile, UploadedFile};
