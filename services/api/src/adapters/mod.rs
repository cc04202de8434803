pub mod store;
pub mod tutor_llm;

pub use store::JsonStoreAdapter;
pub use tutor_llm::OpenAiTutorAdapter;
