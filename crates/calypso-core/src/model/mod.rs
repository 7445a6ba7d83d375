pub mod lstm;
pub mod srl;

pub use lstm::{LstmCell, StackedBiLstm};
pub use srl::{device_from_ordinal, SrlModel, WEIGHTS_FILE};
