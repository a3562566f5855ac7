mod filler;
mod registry;
mod words;

pub use filler::FillerTermGenerator;
pub use registry::TermRegistry;
pub use words::{
    FileWordListLoader, StaticWordListLoader, WordList, WordListCache, WordListError,
    WordListLoader, DEFAULT_WORDS_PATH,
};
