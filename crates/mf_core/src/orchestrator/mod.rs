//! Job orchestration: bank sweeps, batch builds and request dispatch.
//!
//! ```text
//! JobRequest (JSON)
//!     └── ExecutionBridge::submit
//!             ├── Sweep → BankSweepController
//!             │       search each template → rank → result tables → diagnostics
//!             └── Build → TemplateBatchBuilder
//!                     plan names → range filter → synthesize → .tpl / .wav
//! ```
//!
//! Both entry points report progress and poll for cancellation through a
//! `JobChannel`, and return a `JobOutcome` that says whether they ran to the
//! end.
//!
//! # Example
//!
//! ```no_run
//! use mf_core::bank::TemplateBank;
//! use mf_core::config::Settings;
//! use mf_core::jobs::FileChannel;
//! use mf_core::orchestrator::BankSweepController;
//! use std::path::Path;
//!
//! let controller = BankSweepController::new(Settings::default()).unwrap();
//! let signal = controller.load_signal(Path::new("GW150914_H1.wav")).unwrap();
//! let bank = TemplateBank::from_paths(&["template_banks/bbh"]).unwrap();
//! let out = controller.signal_output_dir(signal.name());
//!
//! let outcome = controller
//!     .sweep(&bank, &signal, &out, &FileChannel::for_sweep(&out))
//!     .unwrap();
//! println!("best: {:?}", outcome.value().best());
//! ```

mod batch;
mod bridge;
mod diagnostics;
mod errors;
mod request;
mod results;
mod sweep;

pub use batch::{BuildOptions, BuildReport, ItemOutcome, PlannedItem, TemplateBatchBuilder};
pub use bridge::{ExecutionBridge, LocalBridge, UnavailableBridge};
pub use diagnostics::{
    select_for_rendering, DiagnosticItem, DiagnosticRenderer, OverlayTraceWriter,
};
pub use errors::{EngineError, EngineResult};
pub use request::{JobRequest, JobSummary};
pub use results::{
    load_table, rank, rank_order, write_table, RankedResult, TableOrder, RESULTS_FILE,
    SORTED_RESULTS_FILE,
};
pub use sweep::{BankSweepController, SweepReport};
