use std::time::Duration;

use motor_link::{
    ConnectionState, Effect, LinkError, Liveness, PanelConfig, ReconnectPolicy, Session,
};
use motor_link::Command;

const URL: &str = "ws://192.168.4.1/ws";

fn open_session(config: &PanelConfig, now: u64) -> Session {
    let mut session = Session::new(URL, config, 0);
    let mut out = Vec::new();
    session.connect(&mut out).unwrap();
    session.on_open(now, &mut out).unwrap();
    session
}

fn count_reconnects(out: &[Effect]) -> usize {
    out.iter()
        .filter(|e| matches!(e, Effect::ScheduleReconnect { .. }))
        .count()
}

#[test]
fn test_connect_opens_transport() {
    let mut session = Session::new(URL, &PanelConfig::default(), 0);
    let mut out = Vec::new();

    session.connect(&mut out).unwrap();

    assert_eq!(session.state(), ConnectionState::Connecting);
    assert_eq!(
        out,
        vec![
            Effect::ConnectionChanged(ConnectionState::Connecting),
            Effect::OpenTransport { url: URL.to_string() },
        ]
    );
}

#[test]
fn test_connect_while_connecting_is_rejected() {
    let mut session = Session::new(URL, &PanelConfig::default(), 0);
    let mut out = Vec::new();
    session.connect(&mut out).unwrap();

    let result = session.connect(&mut out);
    assert!(matches!(
        result,
        Err(LinkError::InvalidTransition { from: ConnectionState::Connecting, .. })
    ));
}

#[test]
fn test_open_sends_refresh_request() {
    let mut session = Session::new(URL, &PanelConfig::default(), 0);
    let mut out = Vec::new();
    session.connect(&mut out).unwrap();
    out.clear();

    session.on_open(1000, &mut out).unwrap();

    assert!(session.is_open());
    let sent: Vec<&String> = out
        .iter()
        .filter_map(|e| match e {
            Effect::Send(text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(sent.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(sent[0]).unwrap();
    assert_eq!(parsed["type"], "get_ip");
    assert_eq!(parsed["timestamp"], 1000);
}

#[test]
fn test_close_schedules_exactly_one_reconnect() {
    let mut session = open_session(&PanelConfig::default(), 0);
    let mut out = Vec::new();

    assert!(session.on_close(&mut out));
    // onerror followed by onclose for the same drop
    assert!(!session.on_close(&mut out));

    assert_eq!(session.state(), ConnectionState::Closed);
    assert_eq!(count_reconnects(&out), 1);
    assert!(out.contains(&Effect::ScheduleReconnect { delay: Duration::from_millis(3000) }));
}

#[test]
fn test_reconnect_cycle() {
    let mut session = open_session(&PanelConfig::default(), 0);
    let mut out = Vec::new();
    session.on_close(&mut out);
    out.clear();

    session.on_reconnect_due(&mut out).unwrap();
    assert_eq!(session.state(), ConnectionState::Connecting);
    assert!(out.contains(&Effect::OpenTransport { url: URL.to_string() }));

    // connection attempt fails: another single reconnect
    out.clear();
    session.on_close(&mut out);
    assert_eq!(count_reconnects(&out), 1);
}

#[test]
fn test_stale_reconnect_timer_is_ignored() {
    let mut session = open_session(&PanelConfig::default(), 0);
    let mut out = Vec::new();
    session.on_close(&mut out);

    // user reconnects by hand before the timer fires
    out.clear();
    session.connect(&mut out).unwrap();
    assert!(out.contains(&Effect::CancelReconnect));

    out.clear();
    session.on_reconnect_due(&mut out).unwrap();
    assert!(out.is_empty());
    assert_eq!(session.state(), ConnectionState::Connecting);
}

#[test]
fn test_exponential_backoff_resets_on_open() {
    let config = PanelConfig {
        reconnect: ReconnectPolicy::Exponential { base_ms: 1000, max_ms: 3000 },
        ..Default::default()
    };
    let mut session = Session::new(URL, &config, 0);
    let mut out = Vec::new();
    session.connect(&mut out).unwrap();

    let mut delays = Vec::new();
    for _ in 0..4 {
        out.clear();
        session.on_close(&mut out);
        for effect in &out {
            if let Effect::ScheduleReconnect { delay } = effect {
                delays.push(delay.as_millis());
            }
        }
        session.on_reconnect_due(&mut out).unwrap();
    }
    assert_eq!(delays, vec![1000, 2000, 3000, 3000]);

    session.on_open(0, &mut out).unwrap();
    assert_eq!(session.reconnect_delay(), Duration::from_millis(1000));
}

#[test]
fn test_send_requires_open_session() {
    let mut session = Session::new(URL, &PanelConfig::default(), 0);
    let mut out = Vec::new();

    let result = session.send(&Command::EmergencyStop {}, 0, &mut out);

    assert_eq!(result, Err(LinkError::NotConnected));
    assert!(out.is_empty());
}

#[test]
fn test_liveness_pings_after_silence() {
    let mut session = open_session(&PanelConfig::default(), 0);
    let mut out = Vec::new();

    assert_eq!(session.liveness_check(10_000, &mut out), Liveness::Fresh);
    assert!(out.is_empty());

    assert_eq!(session.liveness_check(16_000, &mut out), Liveness::Pinged);
    assert_eq!(out.len(), 1);
    assert!(matches!(out[0], Effect::Send(ref text) if text.contains("\"get_ip\"")));
}

#[test]
fn test_messages_reset_silence() {
    let mut session = open_session(&PanelConfig::default(), 0);
    let mut out = Vec::new();

    session.on_message(r#"{"ip":"1.2.3.4"}"#, 12_000).unwrap();

    assert_eq!(session.liveness_check(16_000, &mut out), Liveness::Fresh);
    assert_eq!(session.last_message_at(), 12_000);
}

#[test]
fn test_liveness_inactive_when_not_open() {
    let mut session = Session::new(URL, &PanelConfig::default(), 0);
    let mut out = Vec::new();
    assert_eq!(session.liveness_check(100_000, &mut out), Liveness::Inactive);
    assert!(out.is_empty());
}

#[test]
fn test_forced_reconnect_when_configured() {
    let config = PanelConfig {
        force_reconnect_after_ms: Some(30_000),
        ..Default::default()
    };
    let mut session = open_session(&config, 0);
    let mut out = Vec::new();

    assert_eq!(session.liveness_check(20_000, &mut out), Liveness::Pinged);
    out.clear();

    assert_eq!(session.liveness_check(31_000, &mut out), Liveness::ForcedReconnect);
    assert_eq!(out[0], Effect::CloseTransport);
    assert_eq!(session.state(), ConnectionState::Closed);
    assert_eq!(count_reconnects(&out), 1);
}

#[test]
fn test_decode_failure_is_counted_not_fatal() {
    let mut session = open_session(&PanelConfig::default(), 0);

    assert!(matches!(session.on_message("garbage", 5), Err(LinkError::Decode(_))));
    assert!(matches!(session.on_message("[]", 6), Err(LinkError::Decode(_))));

    assert_eq!(session.decode_failures(), 2);
    assert!(session.is_open());
    assert_eq!(session.last_message_at(), 0);
}
