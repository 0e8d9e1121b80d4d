use std::path::Path;

use keylatch::hid::{
    HidError, HidEvent, device::probe_device, report::BOOT_KEYBOARD_REPORT_DESCRIPTOR,
    start_hid_transport,
};
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

fn make_sysfs(root: &Path, name: &str, uevent: &str) {
    let dir = root.join(name).join("device");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("uevent"), uevent).unwrap();
    std::fs::write(dir.join("report_descriptor"), BOOT_KEYBOARD_REPORT_DESCRIPTOR).unwrap();
}

async fn next_event(rx: &mut mpsc::Receiver<HidEvent>) -> HidEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed")
}

#[test]
fn test_probe_reads_ids_serial_and_descriptor() {
    let root = tempfile::tempdir().unwrap();
    make_sysfs(
        root.path(),
        "hidraw3",
        "DRIVER=hid-generic\nHID_ID=0003:00001050:00000407\nHID_NAME=Yubico YubiKey\nHID_UNIQ=ab\n",
    );

    let info = probe_device(root.path(), "hidraw3").unwrap();
    assert_eq!(info.vid, 0x1050);
    assert_eq!(info.pid, 0x0407);
    assert_eq!(info.serial, vec![b'a', 0, b'b', 0]);
    assert_eq!(info.report_descriptor, BOOT_KEYBOARD_REPORT_DESCRIPTOR);
}

#[test]
fn test_probe_missing_node_is_sysfs_error() {
    let root = tempfile::tempdir().unwrap();
    let err = probe_device(root.path(), "hidraw9").unwrap_err();
    assert!(matches!(err, HidError::Sysfs(_)));
}

#[tokio::test]
async fn test_transport_forwards_reports_from_node() {
    let root = tempfile::tempdir().unwrap();
    make_sysfs(root.path(), "hidraw0", "HID_ID=0003:000004D9:0000A0F8\n");
    let dev = tempfile::tempdir().unwrap();
    let node = dev.path().join("hidraw0");
    std::fs::write(&node, [0x02, 0x00, 0x04, 0, 0, 0, 0, 0]).unwrap();

    let mut transport = start_hid_transport(node, root.path().to_path_buf());
    let HidEvent::Connected(info) = next_event(&mut transport.events_rx).await else {
        panic!("expected Connected first");
    };
    assert_eq!((info.vid, info.pid), (0x04D9, 0xA0F8));
    assert!(info.serial.is_empty());
    assert_eq!(
        next_event(&mut transport.events_rx).await,
        HidEvent::Report(vec![0x02, 0x00, 0x04, 0, 0, 0, 0, 0])
    );
    assert_eq!(next_event(&mut transport.events_rx).await, HidEvent::Disconnected);

    drop(transport.events_rx);
    let result = timeout(Duration::from_secs(5), transport.task)
        .await
        .expect("transport did not stop")
        .expect("transport panicked");
    assert!(result.is_ok());
}
