//! Pipeline module - candidate generation, selection, SFT and DPO datasets.

mod dpo;
mod generate;
mod run;
mod select;
mod sft;

pub use dpo::*;
pub use generate::*;
pub use run::*;
pub use select::select_best_of_n;
pub use sft::*;
