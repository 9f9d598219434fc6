//! Navigation history across tabs.
//!
//! - [`visits`]: the visit graph store
//! - [`tabs`]: live tab records with the unique position index
//! - [`reconcile`]: startup matching of stale records to live tabs
//! - [`move_chain`]: cascade resolution for manual tab moves
//! - [`tracker`]: the operations the host event layer calls
//! - [`events`]: host event stream and replay driver

pub mod events;
pub mod host;
pub mod integrity;
pub mod model;
pub mod move_chain;
pub mod reconcile;
pub mod tabs;
pub mod tracker;
pub mod visits;

pub use host::{TabHost, TabStrip};
pub use model::{
    Creation, CreationCause, End, EndCause, NewVisit, Page, RealTab, TabId, TabMove, TabRecord,
    Visit, VisitId,
};
pub use tracker::{SessionImport, TabTracker};
