//! Device quirks applied before attach.

use hmap::{DeviceInfo, HidTransport, ReportType};
use tracing::{debug, warn};

use crate::ids::{WACOM_VENDOR_ID, product_ids};

/// Feature report ID 2 with value 0x0202. The Graphire3 4x5 returns no
/// digitizer data until it is written.
pub const GRAPHIRE3_INIT_REPORT: [u8; 3] = [2, 2, 2];

pub fn needs_graphire3_init(info: &DeviceInfo) -> bool {
    info.matches(WACOM_VENDOR_ID, product_ids::GRAPHIRE3_4X5)
}

/// Write the Graphire3 4x5 init report when the device needs it.
///
/// Returns whether the report was written. Failures are logged and
/// swallowed.
pub fn apply_init_quirks<T: HidTransport>(transport: &mut T) -> bool {
    if !needs_graphire3_init(transport.device_info()) {
        return false;
    }
    let report_id = GRAPHIRE3_INIT_REPORT[0];
    match transport.set_report(&GRAPHIRE3_INIT_REPORT, ReportType::Feature, report_id) {
        Ok(()) => {
            debug!("Graphire3 4x5 init report written");
            true
        }
        Err(e) => {
            warn!("set feature report failed, error={} (ignored)", e);
            false
        }
    }
}
