//! Integration tests for the touchkey-core wire codec.
//!
//! These exercise the path a frame takes end to end: the client resolver
//! produces a key-state vector, the codec turns it into a text frame, and the
//! service side decodes it back into the set of active indices.

use touchkey_core::{
    decode_client_message, decode_service_message, encode_client_message,
    encode_service_message, ClientMessage, KeyElement, KeyRect, KeyStateVector, ServiceMessage,
    TouchFrame, TouchResolver,
};

fn decode_active(frame: &str) -> (usize, Vec<usize>) {
    match decode_client_message(frame).expect("decode must succeed") {
        ClientMessage::KeyState(state) => (state.len(), state.active().collect()),
        other => panic!("expected a key-state update, got {other:?}"),
    }
}

#[test]
fn test_roundtrip_active_indices_0_2_5_of_16() {
    // Arrange
    let state = KeyStateVector::from_active(16, [0, 2, 5]);

    // Act
    let frame = encode_client_message(&ClientMessage::KeyState(state));
    let (len, active) = decode_active(&frame);

    // Assert
    assert_eq!(frame, "b1010010000000000");
    assert_eq!(len, 16);
    assert_eq!(active, vec![0, 2, 5]);
}

#[test]
fn test_roundtrip_probe_and_reply() {
    let probe = encode_client_message(&ClientMessage::Probe);
    assert_eq!(decode_client_message(&probe).unwrap(), ClientMessage::Probe);

    let reply = encode_service_message(&ServiceMessage::Reply);
    assert_eq!(decode_service_message(&reply).unwrap(), ServiceMessage::Reply);
}

#[test]
fn test_resolver_frame_survives_the_wire() {
    // Arrange: 16 keys, 60 px wide, one row.
    let elements: Vec<KeyElement> = (0..16)
        .map(|kflag| KeyElement {
            kflag,
            rect: KeyRect {
                left: kflag as i32 * 60,
                top: 0,
                width: 60,
                height: 120,
            },
        })
        .collect();
    let mut resolver = TouchResolver::compile(&elements, 960).unwrap();

    // Centre of key 4 and the right bias zone of key 9 (wakes key 10).
    let frame = TouchFrame::from_points([(270.0, 60.0), (590.0, 60.0)]);

    // Act
    let result = resolver.compute_frame(&frame);
    let wire = encode_client_message(&ClientMessage::KeyState(result.state));
    let (len, active) = decode_active(&wire);

    // Assert
    assert_eq!(len, 16);
    assert_eq!(active, vec![4, 9, 10]);
}

#[test]
fn test_every_frame_is_full_width_even_when_unchanged() {
    let elements = vec![
        KeyElement {
            kflag: 0,
            rect: KeyRect { left: 0, top: 0, width: 50, height: 50 },
        },
        KeyElement {
            kflag: 1,
            rect: KeyRect { left: 50, top: 0, width: 50, height: 50 },
        },
    ];
    let mut resolver = TouchResolver::compile(&elements, 100).unwrap();
    let touch = TouchFrame::from_points([(25.0, 25.0)]);

    let first = resolver.compute_frame(&touch);
    let second = resolver.compute_frame(&touch);

    assert!(second.changes.is_empty());
    assert_eq!(
        encode_client_message(&ClientMessage::KeyState(first.state)),
        encode_client_message(&ClientMessage::KeyState(second.state))
    );
}
