pub mod optimizer;
pub mod schema;
pub mod session;
pub mod store;

pub use optimizer::{apply_setpoints, EmsSetpoints, SetpointChange, SetpointError};
pub use schema::{default_droop_parameters, DeviceRecord, SiteConfig};
pub use session::{DeviceLimits, DroopCurveView, DroopSession};
pub use store::{ConfigStore, InMemoryConfigStore, StoreError};
