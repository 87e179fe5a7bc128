//! Reachability probing.
//!
//! - [`Prober`]: capability trait for a single echo probe
//! - [`IcmpProber`]: ICMP echo implementation over `surge-ping`
//! - [`Target`]: validated host address

mod icmp;
mod target;
mod traits;

pub use icmp::IcmpProber;
pub use target::{Target, TargetError, parse_target_list, validate_targets};
pub use traits::{ProbeError, Prober};
