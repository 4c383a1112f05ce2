//! Bus notifications from the OS USB stack via `nusb`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use futures::executor::block_on_stream;
use nusb::hotplug::HotplugEvent as BusEvent;
use nusb::DeviceInfo;
use tracing::{debug, warn};

use crate::app::error::AppError;
use crate::app::hotplug::{HotplugEvent, HotplugSink, HotplugSource, Subscription};
use crate::app::models::DeviceKey;

const VENDOR_SPECIFIC_CLASS: u8 = 0xff;
const ANDROID_SUBCLASS: u8 = 0x42;

/// Tag for Android's vendor-specific interface triples, appended to the description so
/// the classifier sees the mode even when the descriptor strings do not name it.
pub fn interface_tag(class: u8, subclass: u8, protocol: u8) -> Option<&'static str> {
    if class != VENDOR_SPECIFIC_CLASS || subclass != ANDROID_SUBCLASS {
        return None;
    }
    match protocol {
        0x01 => Some("ADB"),
        0x03 => Some("FASTBOOT"),
        _ => None,
    }
}

pub fn display_name(product: Option<&str>, vendor_id: u16, product_id: u16) -> String {
    product
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("USB device {vendor_id:04x}:{product_id:04x}"))
}

pub fn describe(manufacturer: Option<&str>, interfaces: &[(u8, u8, u8, Option<&str>)]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(manufacturer) = manufacturer.map(str::trim).filter(|value| !value.is_empty()) {
        parts.push(manufacturer);
    }
    for (class, subclass, protocol, label) in interfaces {
        if let Some(label) = label.map(str::trim).filter(|value| !value.is_empty()) {
            parts.push(label);
        }
        if let Some(tag) = interface_tag(*class, *subclass, *protocol) {
            parts.push(tag);
        }
    }
    parts.join(" ")
}

fn arrival(info: &DeviceInfo) -> HotplugEvent {
    let interfaces: Vec<(u8, u8, u8, Option<&str>)> = info
        .interfaces()
        .map(|iface| {
            (
                iface.class(),
                iface.subclass(),
                iface.protocol(),
                iface.interface_string(),
            )
        })
        .collect();
    HotplugEvent::Arrived {
        key: DeviceKey(format!("{:?}", info.id())),
        name: display_name(info.product_string(), info.vendor_id(), info.product_id()),
        description: describe(info.manufacturer_string(), &interfaces),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UsbHotplugSource;

impl HotplugSource for UsbHotplugSource {
    fn subscribe(&self, sink: HotplugSink) -> Result<Subscription, AppError> {
        let watch = nusb::watch_devices().map_err(|err| {
            AppError::unsupported_platform(format!("USB hotplug watch unavailable: {err}"), "")
        })?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop_flag);
        let join = thread::Builder::new()
            .name("usb-hotplug".to_string())
            .spawn(move || {
                for event in block_on_stream(watch) {
                    if stop_thread.load(Ordering::Relaxed) {
                        break;
                    }
                    let forwarded = match event {
                        BusEvent::Connected(info) => arrival(&info),
                        BusEvent::Disconnected(id) => HotplugEvent::Removed {
                            key: DeviceKey(format!("{id:?}")),
                        },
                    };
                    debug!(event = ?forwarded, "usb bus event");
                    sink(forwarded);
                }
                if !stop_thread.load(Ordering::Relaxed) {
                    warn!("usb hotplug stream ended");
                }
            })
            .map_err(|err| AppError::system(format!("Failed to spawn hotplug thread: {err}"), ""))?;

        Ok(Subscription::new(stop_flag, Some(join)))
    }
}
