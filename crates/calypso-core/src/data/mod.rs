pub mod instance;
pub mod iterator;
pub mod ontonotes;

pub use instance::SrlInstance;
pub use iterator::{Batch, BatchIterator};
pub use ontonotes::{parse_conll, OntonotesReader};
