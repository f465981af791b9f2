#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Command dispatch and wire-level behavior, including a full socket
//! round trip through the local transport.

use futures::{SinkExt, StreamExt};
use pldm_bios::codec::{bcd_to_dec16, bcd_to_dec8};
use pldm_bios::core::codec::Frame;
use pldm_bios::definitions::parse_definitions;
use pldm_bios::protocol::message::{opcode, Command, CompletionCode, TRANSFER_GET_FIRST_PART};
use pldm_bios::protocol::{BiosHandler, Dispatcher};
use pldm_bios::storage::MemStore;
use pldm_bios::table::{validate, TableKind};
use pldm_bios::transport::local;
use std::sync::Arc;
use tokio::sync::mpsc;

const DEFINITIONS: &str = r#"[
    {"name": "BootMode", "type": "enumeration",
     "possible_values": ["Legacy", "UEFI"], "default_values": ["UEFI"]},
    {"name": "RebootLimit", "type": "integer",
     "lower_bound": 0, "upper_bound": 10, "scalar_increment": 1, "default_value": 1}
]"#;

fn dispatcher() -> Arc<Dispatcher> {
    let defs = parse_definitions(DEFINITIONS).expect("valid definitions");
    let handler = Arc::new(BiosHandler::new(Arc::new(MemStore::new()), defs));
    let dispatcher = Arc::new(Dispatcher::new());
    handler.register(&dispatcher).expect("register");
    dispatcher
}

// ============================================================================
// DISPATCH
// ============================================================================

#[test]
fn test_unknown_opcode_answers_unsupported() {
    let d = dispatcher();
    let resp = d
        .dispatch(&Command {
            opcode: 0x30, // a sensor-family opcode this responder does not serve
            payload: vec![],
        })
        .expect("dispatch");
    assert_eq!(resp, vec![CompletionCode::UnsupportedCommand.byte()]);
}

#[test]
fn test_get_date_time_fields_decode_as_bcd() {
    let d = dispatcher();
    let resp = d
        .dispatch(&Command {
            opcode: opcode::GET_DATE_TIME,
            payload: vec![],
        })
        .expect("dispatch");
    assert_eq!(resp.len(), 8);
    assert_eq!(resp[0], CompletionCode::Success.byte());
    let seconds = bcd_to_dec8(resp[1]).expect("bcd");
    let minutes = bcd_to_dec8(resp[2]).expect("bcd");
    let hours = bcd_to_dec8(resp[3]).expect("bcd");
    let day = bcd_to_dec8(resp[4]).expect("bcd");
    let month = bcd_to_dec8(resp[5]).expect("bcd");
    let year = bcd_to_dec16(u16::from_le_bytes([resp[6], resp[7]])).expect("bcd");
    assert!(seconds <= 59 && minutes <= 59 && hours <= 23);
    assert!((1..=31).contains(&day) && (1..=12).contains(&month));
    assert!(year >= 2024);
}

#[test]
fn test_set_date_time_wire_vector() {
    let d = dispatcher();
    // 2023-01-15T10:30:45Z in packed BCD, year low byte first
    let resp = d
        .dispatch(&Command {
            opcode: opcode::SET_DATE_TIME,
            payload: vec![0x45, 0x30, 0x10, 0x15, 0x01, 0x23, 0x20],
        })
        .expect("dispatch");
    assert_eq!(resp, vec![CompletionCode::Success.byte()]);
}

#[test]
fn test_set_date_time_wrong_length() {
    let d = dispatcher();
    let resp = d
        .dispatch(&Command {
            opcode: opcode::SET_DATE_TIME,
            payload: vec![0x45, 0x30, 0x10],
        })
        .expect("dispatch");
    assert_eq!(resp, vec![CompletionCode::InvalidLength.byte()]);
}

#[test]
fn test_get_bios_table_serves_verifiable_tables() {
    let d = dispatcher();
    for kind in [TableKind::String, TableKind::Attribute, TableKind::AttributeValue] {
        let resp = d
            .dispatch(&Command {
                opcode: opcode::GET_BIOS_TABLE,
                payload: vec![0, 0, 0, 0, TRANSFER_GET_FIRST_PART, kind as u8],
            })
            .expect("dispatch");
        assert_eq!(resp[0], CompletionCode::Success.byte());
        validate(kind, &resp[6..]).expect("served table verifies");
    }
}

#[test]
fn test_get_bios_table_unknown_selector() {
    let d = dispatcher();
    let resp = d
        .dispatch(&Command {
            opcode: opcode::GET_BIOS_TABLE,
            payload: vec![0, 0, 0, 0, TRANSFER_GET_FIRST_PART, 7],
        })
        .expect("dispatch");
    assert_eq!(resp, vec![CompletionCode::InvalidTableType.byte()]);
}

// ============================================================================
// SOCKET ROUND TRIP
// ============================================================================

#[tokio::test]
async fn test_commands_over_unix_socket() {
    let socket = std::env::temp_dir().join(format!(
        "pldm-bios-test-{}-{:?}.sock",
        std::process::id(),
        std::thread::current().id()
    ));
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    let server_socket = socket.clone();
    let server_dispatcher = dispatcher();
    let server = tokio::spawn(async move {
        local::start_server_with_shutdown(server_socket, server_dispatcher, shutdown_rx).await
    });

    // wait for the socket to appear
    for _ in 0..50 {
        if socket.exists() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let mut client = local::connect(&socket).await.expect("connect");

    // GetDateTime over the wire
    client
        .send(Frame {
            payload: vec![opcode::GET_DATE_TIME],
        })
        .await
        .expect("send");
    let resp = client
        .next()
        .await
        .expect("response frame")
        .expect("clean decode");
    assert_eq!(resp.payload.len(), 8);
    assert_eq!(resp.payload[0], CompletionCode::Success.byte());

    // unroutable empty frame answers InvalidLength
    client
        .send(Frame { payload: vec![] })
        .await
        .expect("send");
    let resp = client
        .next()
        .await
        .expect("response frame")
        .expect("clean decode");
    assert_eq!(resp.payload, vec![CompletionCode::InvalidLength.byte()]);

    shutdown_tx.send(()).await.expect("shutdown");
    server.await.expect("join").expect("server exits cleanly");
    assert!(!socket.exists());
}
