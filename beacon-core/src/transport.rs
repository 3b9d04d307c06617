//! Transport and sensor seams
//!
//! The core never talks to a BLE stack or an I2C bus directly. Firmware
//! implements [`Notifier`] over its GATT server and [`SensorDriver`] over the
//! sensor; tests implement both with recording fakes.

use crate::constants::transport::{
    CONFIG_CHAR_UUID, DEFAULT_PACKET_CAPACITY, LIVE_CHAR_UUID, LOG_CONTROL_CHAR_UUID,
    LOG_DATA_CHAR_UUID, SERVICE_UUID,
};
use crate::errors::{SensorError, TransportError};

/// Logical characteristic a payload travels on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Latest reading (read, notify)
    Live,
    /// Sampling interval (read, write, notify)
    Config,
    /// Log packets (notify)
    LogData,
    /// Log commands and their responses (write, notify)
    LogControl,
}

impl Channel {
    /// Every channel, in service declaration order
    pub const ALL: [Channel; 4] = [Self::Live, Self::LogData, Self::Config, Self::LogControl];

    /// Service every channel is declared under
    pub const SERVICE_UUID: u16 = SERVICE_UUID;

    /// 16-bit characteristic UUID
    pub const fn uuid(self) -> u16 {
        match self {
            Self::Live => LIVE_CHAR_UUID,
            Self::Config => CONFIG_CHAR_UUID,
            Self::LogData => LOG_DATA_CHAR_UUID,
            Self::LogControl => LOG_CONTROL_CHAR_UUID,
        }
    }

    /// Channel owning a characteristic UUID
    pub fn from_uuid(uuid: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    /// Whether clients may read the characteristic
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::Live | Self::Config)
    }

    /// Whether clients may write the characteristic
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Config | Self::LogControl)
    }

    /// Name for logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Config => "config",
            Self::LogData => "log-data",
            Self::LogControl => "log-control",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Channel {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

/// Outbound side of the wireless link
pub trait Notifier {
    /// Send `payload` as a notification on `channel`
    fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<(), TransportError>;

    /// Whether a client is connected
    fn is_connected(&self) -> bool;

    /// Largest notification payload the link accepts (MTU minus ATT header)
    fn max_payload(&self) -> usize {
        DEFAULT_PACKET_CAPACITY
    }
}

impl<T: Notifier + ?Sized> Notifier for &mut T {
    fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<(), TransportError> {
        (**self).notify(channel, payload)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn max_payload(&self) -> usize {
        (**self).max_payload()
    }
}

/// Temperature and humidity sensor
pub trait SensorDriver {
    /// One measurement as `(temperature °C, relative humidity %)`
    fn read_sample(&mut self) -> Result<(f32, f32), SensorError>;
}

impl<T: SensorDriver + ?Sized> SensorDriver for &mut T {
    fn read_sample(&mut self) -> Result<(f32, f32), SensorError> {
        (**self).read_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_map_both_ways() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_uuid(channel.uuid()), Some(channel));
        }
        assert_eq!(Channel::from_uuid(Channel::SERVICE_UUID), None);
    }

    #[test]
    fn log_data_is_notify_only() {
        assert!(!Channel::LogData.is_readable());
        assert!(!Channel::LogData.is_writable());
        assert!(Channel::LogControl.is_writable());
        assert!(!Channel::LogControl.is_readable());
    }
}
