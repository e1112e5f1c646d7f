//! Local cache: layout, reconciliation against the catalogs, and extras.

pub mod additions;
pub mod extras;
pub mod layout;
pub mod reconcile;

pub use additions::{AdditionsReport, cache_additions};
pub use extras::Extras;
pub use layout::{Bucket, CacheLayout};
pub use reconcile::{BucketReport, ReconcileReport, Reconciler, SweepPolicy};
