pub mod animator;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod layout;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod snapshot;
pub mod theme;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use model::{DeviceKind, DeviceStatus, Position, TopologyState};
pub use reconcile::{ChangeSet, Poller, Reconciler};
pub use registry::{LinkRecord, Severity, canonical_link_id};
pub use snapshot::{Snapshot, parse_snapshot, rows_to_snapshot};
pub use theme::Theme;
pub use view::{RecordingRenderer, Renderer, build_elements};
