pub mod indicators;
pub mod vocabulary;

pub use indicators::PivotLocator;
pub use vocabulary::SideVocabulary;
