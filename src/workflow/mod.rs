pub mod intake_ctx;
pub mod intake_flow;

pub use intake_ctx::IntakeCtx;
pub use intake_flow::{edit_draft, save_single, FileOutcome, IntakeBatch, IntakeFlow};
