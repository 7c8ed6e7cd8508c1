//! Interface to the HID transport below the engine.

use crate::error::TransportError;
use crate::sink::InputId;
use serde::{Deserialize, Serialize};

pub const BUS_USB: u16 = 0x03;
pub const BUS_BLUETOOTH: u16 = 0x05;
pub const BUS_I2C: u16 = 0x18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

/// Identity of the device behind a transport.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub bustype: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub version: u16,
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_bus(mut self, bustype: u16) -> Self {
        self.bustype = bustype;
        self
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    pub fn input_id(&self) -> InputId {
        InputId {
            bustype: self.bustype,
            vendor: self.vendor_id,
            product: self.product_id,
            version: self.version,
        }
    }
}

/// HID transport (USB, I2C, ...).
///
/// Input reports reach the engine either pushed through
/// [`Hmap::handle_report`](crate::Hmap::handle_report) from the transport's
/// interrupt path after [`start`](HidTransport::start), or pulled with
/// [`read_input`](HidTransport::read_input).
pub trait HidTransport {
    /// Raw report descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the descriptor cannot be fetched.
    fn report_descriptor(&mut self) -> Result<Vec<u8>, TransportError>;

    fn device_info(&self) -> &DeviceInfo;

    /// Send an output or feature report. `data` includes the report ID byte
    /// when `report_id` is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on I/O failure.
    fn set_report(
        &mut self,
        data: &[u8],
        report_type: ReportType,
        report_id: u8,
    ) -> Result<(), TransportError>;

    /// Fetch a report into `buf` and return its length.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on I/O failure.
    fn get_report(
        &mut self,
        buf: &mut [u8],
        report_type: ReportType,
        report_id: u8,
    ) -> Result<usize, TransportError>;

    /// Enable input report delivery with buffers of `input_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the interrupt path cannot be started.
    fn start(&mut self, input_size: usize) -> Result<(), TransportError>;

    fn stop(&mut self);

    /// Read one pending input report into `buf`. `Ok(0)` means nothing was
    /// pending.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on I/O failure.
    fn read_input(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_builder() {
        let info = DeviceInfo::new(0x056a, 0x0013)
            .with_name("Wacom Graphire3 4x5")
            .with_bus(BUS_USB)
            .with_version(0x0100);
        assert!(info.matches(0x056a, 0x0013));
        assert!(!info.matches(0x056a, 0x0014));
        assert_eq!(
            info.input_id(),
            InputId {
                bustype: BUS_USB,
                vendor: 0x056a,
                product: 0x0013,
                version: 0x0100
            }
        );
    }
}
