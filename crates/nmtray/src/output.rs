//! Output formatting: plain text or JSON.
//!
//! The watch loop renders through [`StdoutPresenter`]; `menu` renders a
//! [`Menu`] once.

use std::fmt::Write as _;
use std::io::{self, Write};

use nmtray_core::menu::{CUSTOM_NETWORK_LABEL, DAEMON_NOT_RUNNING_LABEL, NO_DEVICES_LABEL};
use nmtray_core::{DisplayView, Menu, MenuEntry, Presenter};

use crate::cli::OutputFormat;

// ── Display view ─────────────────────────────────────────────────────

pub fn render_view(format: OutputFormat, view: &DisplayView) -> String {
    match format {
        OutputFormat::Plain => {
            let visibility = if view.visible { "visible" } else { "hidden" };
            if view.state.is_transitional() {
                format!("{} frame={} {visibility}", view.state, view.phase)
            } else {
                format!("{} {visibility}", view.state)
            }
        }
        OutputFormat::Json => render_json(view),
    }
}

/// Prints a line whenever the rendered view differs from the last one.
pub struct StdoutPresenter {
    format: OutputFormat,
    last: Option<DisplayView>,
}

impl StdoutPresenter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, last: None }
    }
}

impl Presenter for StdoutPresenter {
    fn render(&mut self, view: &DisplayView) {
        if self.last.as_ref() == Some(view) {
            return;
        }
        self.last = Some(*view);

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", render_view(self.format, view)) {
            tracing::warn!(error = %e, "failed to write display state");
        }
    }
}

// ── Menu ─────────────────────────────────────────────────────────────

pub fn render_menu(format: OutputFormat, menu: &Menu) -> String {
    match format {
        OutputFormat::Plain => render_menu_plain(menu),
        OutputFormat::Json => render_json(menu),
    }
}

fn render_menu_plain(menu: &Menu) -> String {
    match menu {
        Menu::DaemonNotRunning => DAEMON_NOT_RUNNING_LABEL.to_owned(),
        Menu::NoDevices => NO_DEVICES_LABEL.to_owned(),
        Menu::Devices {
            entries,
            offers_custom_network,
        } => {
            let mut out = String::new();
            for entry in entries {
                write_entry(&mut out, entry);
            }
            if *offers_custom_network {
                out.push_str(CUSTOM_NETWORK_LABEL);
            }
            out.trim_end().to_owned()
        }
    }
}

fn write_entry(out: &mut String, entry: &MenuEntry) {
    let marker = if entry.active { '*' } else { ' ' };
    let _ = writeln!(
        out,
        "{marker} {} ({}) [{}]",
        entry.name, entry.kind, entry.device_id
    );
    for network in &entry.networks {
        let marker = if network.active { '*' } else { ' ' };
        let lock = if network.encrypted { " encrypted" } else { "" };
        let _ = writeln!(
            out,
            "    {marker} {} {}%{lock}",
            network.essid, network.strength
        );
    }
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nmtray_core::{DeviceKind, DisplayState, NetworkSummary, Selection, SignalBucket};
    use pretty_assertions::assert_eq;

    use super::*;

    fn entries() -> Vec<MenuEntry> {
        vec![
            MenuEntry {
                device_id: "eth0".into(),
                name: "Ethernet".into(),
                kind: DeviceKind::Wired,
                active: false,
                networks: vec![],
                selection: Selection::Device {
                    device_id: "eth0".into(),
                },
            },
            MenuEntry {
                device_id: "wlan0".into(),
                name: "Wi-Fi".into(),
                kind: DeviceKind::Wireless,
                active: true,
                networks: vec![NetworkSummary {
                    essid: "home".into(),
                    strength: 80,
                    encrypted: true,
                    active: true,
                    selection: Selection::Network {
                        device_id: "wlan0".into(),
                        essid: "home".into(),
                    },
                }],
                selection: Selection::Device {
                    device_id: "wlan0".into(),
                },
            },
        ]
    }

    #[test]
    fn plain_view_shows_frame_only_when_animating() {
        let scanning = DisplayView {
            state: DisplayState::WirelessScanning,
            phase: 3,
            visible: true,
        };
        assert_eq!(
            render_view(OutputFormat::Plain, &scanning),
            "wireless-scanning frame=3 visible"
        );

        let wireless = DisplayView {
            state: DisplayState::Wireless(SignalBucket::SeventyFive),
            phase: 0,
            visible: false,
        };
        assert_eq!(render_view(OutputFormat::Plain, &wireless), "wireless-75 hidden");
    }

    #[test]
    fn json_view_is_one_line() {
        let view = DisplayView {
            state: DisplayState::Wired,
            phase: 0,
            visible: true,
        };
        let out = render_view(OutputFormat::Json, &view);
        assert!(!out.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["visible"], serde_json::Value::Bool(true));
    }

    #[test]
    fn plain_menu_lists_devices_and_networks() {
        let menu = Menu::Devices {
            entries: entries(),
            offers_custom_network: true,
        };
        let expected = "  Ethernet (wired) [eth0]\n\
                        * Wi-Fi (wireless) [wlan0]\n    \
                        * home 80% encrypted\n\
                        Other Wireless Networks...";
        assert_eq!(render_menu(OutputFormat::Plain, &menu), expected);
    }

    #[test]
    fn plain_menu_placeholders() {
        assert_eq!(
            render_menu(OutputFormat::Plain, &Menu::DaemonNotRunning),
            DAEMON_NOT_RUNNING_LABEL
        );
        assert_eq!(render_menu(OutputFormat::Plain, &Menu::NoDevices), NO_DEVICES_LABEL);
    }

    #[test]
    fn json_menu_is_tagged() {
        let out = render_menu(OutputFormat::Json, &Menu::NoDevices);
        assert_eq!(out, r#"{"menu":"no_devices"}"#);
    }
}
