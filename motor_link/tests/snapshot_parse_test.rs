use motor_link::{DecodeError, DeviceSnapshot, GlobalStatus, UpdateKind};

#[test]
fn test_full_broadcast() {
    // Shape of the controller's regular state broadcast
    let json = r#"{
        "ip": "192.168.4.1",
        "globalStatus": "RUNNING",
        "servoState": true,
        "motor0": {"position": 5, "target": 10, "running": true, "calibrating": false, "fullForward": false, "fullBackward": false},
        "motor1": {"position": 0, "target": 0, "running": false, "calibrating": false, "fullForward": false, "fullBackward": false}
    }"#;

    let snapshot = DeviceSnapshot::parse(json, 4).unwrap();

    assert_eq!(snapshot.ip.as_deref(), Some("192.168.4.1"));
    assert_eq!(snapshot.global_status, Some(GlobalStatus::Running));
    assert_eq!(snapshot.servo_state, Some(true));
    assert_eq!(snapshot.motors.len(), 2);

    let m0 = &snapshot.motors[&0];
    assert_eq!(m0.position, Some(5));
    assert_eq!(m0.target, Some(10));
    assert_eq!(m0.running, Some(true));
    assert!(!snapshot.motors.contains_key(&2));
}

#[test]
fn test_lenient_coercion() {
    let json = r#"{
        "servoState": "on",
        "updateProgress": "150",
        "motor0": {"position": 4.6, "target": "12", "running": 1, "fullForward": "false"}
    }"#;

    let snapshot = DeviceSnapshot::parse(json, 4).unwrap();

    assert_eq!(snapshot.servo_state, Some(true));
    assert_eq!(snapshot.update_progress, Some(100));
    let m0 = &snapshot.motors[&0];
    assert_eq!(m0.position, Some(5));
    assert_eq!(m0.target, Some(12));
    assert_eq!(m0.running, Some(true));
    assert_eq!(m0.full_forward, Some(false));
    assert_eq!(m0.calibrating, None);
}

#[test]
fn test_uncoercible_values_are_treated_as_absent() {
    let json = r#"{"servoState": "maybe", "motor0": {"target": [1, 2], "running": 7}}"#;

    let snapshot = DeviceSnapshot::parse(json, 4).unwrap();

    assert_eq!(snapshot.servo_state, None);
    assert_eq!(snapshot.motors[&0].target, None);
    assert_eq!(snapshot.motors[&0].running, None);
}

#[test]
fn test_empty_strings_mean_unchanged() {
    let snapshot = DeviceSnapshot::parse(r#"{"ip": "", "globalStatus": ""}"#, 4).unwrap();
    assert_eq!(snapshot.ip, None);
    assert_eq!(snapshot.global_status, None);
    assert!(snapshot.is_empty());
}

#[test]
fn test_motor_keys_outside_configured_count_are_ignored() {
    let json = r#"{"motor3": {"target": 1}, "motor4": {"target": 2}, "motor0": 17}"#;

    let snapshot = DeviceSnapshot::parse(json, 4).unwrap();

    assert_eq!(snapshot.motors.len(), 1);
    assert_eq!(snapshot.motors[&3].target, Some(1));
}

#[test]
fn test_update_progress_fields() {
    let json = r#"{"updateInProgress": false, "updateProgress": 100, "updateStatus": "Update complete", "updateType": "littlefs"}"#;

    let snapshot = DeviceSnapshot::parse(json, 4).unwrap();

    assert_eq!(snapshot.update_in_progress, Some(false));
    assert_eq!(snapshot.update_progress, Some(100));
    assert_eq!(snapshot.update_status.as_deref(), Some("Update complete"));
    assert_eq!(snapshot.update_kind, Some(UpdateKind::Filesystem));
}

#[test]
fn test_update_info_reply() {
    let json = r#"{"type": "update_info", "data": {"latest_version": "1.4.0", "firmware_url": "http://x/fw.bin", "littlefs_url": ""}}"#;

    let snapshot = DeviceSnapshot::parse(json, 4).unwrap();
    let info = snapshot.update_info.unwrap();

    assert_eq!(info.latest_version.as_deref(), Some("1.4.0"));
    assert_eq!(info.firmware_url.as_deref(), Some("http://x/fw.bin"));
    assert_eq!(info.littlefs_url, None);
    assert!(info.has_any_update());
}

#[test]
fn test_invalid_payloads() {
    assert!(matches!(DeviceSnapshot::parse("{not json", 4), Err(DecodeError::Json(_))));
    assert_eq!(DeviceSnapshot::parse("[1,2,3]", 4), Err(DecodeError::NotAnObject));
    assert_eq!(DeviceSnapshot::parse("\"hello\"", 4), Err(DecodeError::NotAnObject));
}

#[test]
fn test_unknown_status_text_is_kept() {
    let snapshot = DeviceSnapshot::parse(r#"{"globalStatus": "STOPPED"}"#, 4).unwrap();
    assert_eq!(snapshot.global_status, Some(GlobalStatus::Other("STOPPED".to_string())));
}
