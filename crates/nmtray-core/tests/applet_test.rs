#![allow(clippy::unwrap_used)]
// End-to-end: daemon notifications in, display state and menu out.

mod common;

use std::sync::Arc;
use std::time::Duration;

use nmtray_core::menu::CUSTOM_NETWORK_LABEL;
use nmtray_core::{
    Applet, AppletConfig, ConnectivityState, DisplayState, MemorySettingsStore, Menu, Selection,
    SignalBucket,
};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, BufReader};

use common::{RefusingConnector, daemon_link, send_lines, wait_for};

// ── Helpers ─────────────────────────────────────────────────────────

fn config() -> AppletConfig {
    AppletConfig {
        socket_path: "/nonexistent/daemon.sock".into(),
        refresh_interval: Duration::from_secs(1),
        frame_interval: Duration::from_millis(125),
    }
}

const WIRED_AND_WIRELESS: &[&str] = &[
    r#"{"event":"device_added","id":"eth0","kind":"wired","name":"Ethernet"}"#,
    r#"{"event":"device_added","id":"wlan0","kind":"wireless","name":"Wi-Fi"}"#,
    r#"{"event":"scan_result","device_id":"wlan0","networks":[{"essid":"home","strength":80,"encrypted":true},{"essid":"cafe","strength":30}]}"#,
    r#"{"event":"active_changed","device_id":"wlan0","essid":"home"}"#,
    r#"{"event":"state_changed","state":"wireless"}"#,
];

// ── Display state ───────────────────────────────────────────────────

#[tokio::test]
async fn test_wireless_display_state_end_to_end() {
    let (connector, mut daemon) = daemon_link();
    let applet =
        Applet::with_connector(&config(), connector, Arc::new(MemorySettingsStore::new())).unwrap();

    send_lines(&mut daemon, WIRED_AND_WIRELESS).await;
    wait_for(applet.registry(), |r| {
        r.connectivity() == ConnectivityState::Wireless
    })
    .await;

    let view = applet.display_state();
    assert_eq!(view.state, DisplayState::Wireless(SignalBucket::Hundred));
    assert!(view.visible);
    assert!(applet.is_connected());

    applet.shutdown();
}

#[tokio::test]
async fn test_sole_wired_device_hides_icon_until_second_device() {
    let (connector, mut daemon) = daemon_link();
    let applet =
        Applet::with_connector(&config(), connector, Arc::new(MemorySettingsStore::new())).unwrap();

    send_lines(
        &mut daemon,
        &[
            r#"{"event":"device_added","id":"eth0","kind":"wired","name":"Ethernet"}"#,
            r#"{"event":"state_changed","state":"wired"}"#,
        ],
    )
    .await;
    wait_for(applet.registry(), |r| r.connectivity() == ConnectivityState::Wired).await;
    assert!(!applet.display_state().visible);

    send_lines(
        &mut daemon,
        &[r#"{"event":"device_added","id":"wlan0","kind":"wireless","name":"Wi-Fi"}"#],
    )
    .await;
    wait_for(applet.registry(), |r| r.device_count() == 2).await;
    assert!(applet.display_state().visible);

    applet.shutdown();
}

#[tokio::test]
async fn test_unreachable_daemon_shows_no_daemon() {
    let applet = Applet::with_connector(
        &config(),
        RefusingConnector,
        Arc::new(MemorySettingsStore::new()),
    )
    .unwrap();
    applet.shutdown();

    let view = applet.display_state();
    assert_eq!(view.state, DisplayState::NoDaemon);
    assert!(view.visible);
    assert!(!applet.is_connected());
    assert_eq!(applet.menu(), Menu::DaemonNotRunning);
}

// ── Menu and dispatch ───────────────────────────────────────────────

#[tokio::test]
async fn test_menu_selection_round_trip() {
    let (connector, daemon) = daemon_link();
    let store = Arc::new(MemorySettingsStore::new());
    let applet = Applet::with_connector(&config(), connector, store.clone()).unwrap();
    let (daemon_read, mut daemon_write) = tokio::io::split(daemon);

    {
        let mut lines = Vec::new();
        for line in WIRED_AND_WIRELESS {
            lines.push(format!("{line}\n"));
        }
        tokio::io::AsyncWriteExt::write_all(&mut daemon_write, lines.concat().as_bytes())
            .await
            .unwrap();
    }
    wait_for(applet.registry(), |r| {
        r.connectivity() == ConnectivityState::Wireless
    })
    .await;

    let Menu::Devices {
        entries,
        offers_custom_network,
    } = applet.menu()
    else {
        panic!("expected a device menu");
    };
    assert!(offers_custom_network, "{CUSTOM_NETWORK_LABEL} should be offered");
    assert_eq!(entries, applet.list_menu_entries());

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Ethernet", "Wi-Fi"]);
    let wifi = &entries[1];
    assert!(wifi.active);
    let essids: Vec<&str> = wifi.networks.iter().map(|n| n.essid.as_str()).collect();
    assert_eq!(essids, vec!["home", "cafe"]);

    let cafe: Selection = wifi.networks[1].selection.clone();
    applet.dispatch_selection(&cafe).unwrap();

    let mut lines = BufReader::new(daemon_read).lines();
    assert_eq!(
        lines.next_line().await.unwrap().unwrap(),
        r#"{"request":"set_active","device_id":"wlan0","essid":"cafe"}"#
    );
    assert_eq!(store.entries()[0].0, "cafe");

    applet.shutdown();
}
