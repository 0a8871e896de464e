pub mod cjk;
pub mod lexicon;
pub mod normalize;
pub mod query;
pub mod score;
pub mod synonyms;
pub mod tokenize;

mod error;

pub use error::{Error, Result};
pub use lexicon::Lexicon;
pub use query::Query;
pub use score::{FieldScore, MatchField, ScoredText};
