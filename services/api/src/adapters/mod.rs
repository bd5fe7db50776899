pub mod backend;
pub mod db;
pub mod image_search;
pub mod journey_fs;
pub mod journey_llm;

pub use backend::HttpBackendAdapter;
pub use db::DbAdapter;
pub use image_search::HttpImageSearchAdapter;
pub use journey_fs::FsJourneyStore;
pub use journey_llm::OpenAiJourneyAdapter;
