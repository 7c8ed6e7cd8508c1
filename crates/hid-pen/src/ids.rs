//! USB identifiers used by pen quirks.

/// Wacom Co., Ltd.
pub const WACOM_VENDOR_ID: u16 = 0x056a;

pub mod product_ids {
    /// Graphire (ET-0405). Ships a broken report descriptor.
    pub const GRAPHIRE: u16 = 0x0010;
    /// Graphire3 4x5 (CTE-430). Needs an init feature report.
    pub const GRAPHIRE3_4X5: u16 = 0x0013;
}
