//! Synthesis engine behaviour against the recording backend.

use std::sync::Arc;
use std::time::Duration;

use touchkey_service::application::{
    Dispatched, InputBackend, KeySynthesizer, SynthesisError, ToggleOptions,
};
use touchkey_service::domain::input_record::{KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP};
use touchkey_service::domain::{DispatchMode, KeyDirection};
use touchkey_service::infrastructure::input_backend::RecordingBackend;

fn synthesizer(backend: RecordingBackend) -> (KeySynthesizer, Arc<RecordingBackend>) {
    let backend = Arc::new(backend);
    let synth = KeySynthesizer::new(Arc::clone(&backend) as Arc<dyn InputBackend>).unwrap();
    (synth, backend)
}

#[tokio::test]
async fn test_extended_key_down_up_pair_differs_only_in_keyup() {
    // Arrange: Delete translates to an extended scan code
    let (synth, backend) = synthesizer(RecordingBackend::new().with_scan_code(0x2E, 0xE053));
    let options = ToggleOptions::default().with_dispatch(DispatchMode::Sync);

    // Act
    let _ = synth.toggle(0x2E, KeyDirection::Down, &options).await.unwrap();
    let _ = synth.toggle(0x2E, KeyDirection::Up, &options).await.unwrap();

    // Assert
    let records = backend.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].scan_code(), 0x53);
    assert_eq!(records[0].scan_code(), records[1].scan_code());
    assert_ne!(records[0].flags() & KEYEVENTF_EXTENDEDKEY, 0);
    assert_eq!(records[0].flags() ^ records[1].flags(), KEYEVENTF_KEYUP);
}

#[tokio::test]
async fn test_many_async_taps_arrive_in_order() {
    // Arrange
    let (synth, backend) = synthesizer(RecordingBackend::new());
    let options = ToggleOptions::default();

    // Act
    for key_code in 0x31..=0x35u16 {
        synth.tap(key_code, &options).await.unwrap();
    }
    let Dispatched::Pending(last) = synth
        .toggle(0x42, KeyDirection::Down, &options)
        .await
        .unwrap()
    else {
        panic!("async toggle must be pending");
    };
    tokio::time::timeout(Duration::from_secs(5), last)
        .await
        .unwrap()
        .unwrap();

    // Assert: strictly alternating down/up, keys in submission order
    let records = backend.records();
    assert_eq!(records.len(), 11);
    for (i, pair) in records[..10].chunks(2).enumerate() {
        assert_eq!(pair[0].direction(), KeyDirection::Down, "tap {i}");
        assert_eq!(pair[1].direction(), KeyDirection::Up, "tap {i}");
        assert_eq!(pair[0].scan_code(), pair[1].scan_code());
    }
    assert_eq!(records[0].scan_code(), 0x02);
    assert_eq!(records[8].scan_code(), 0x06);
}

#[tokio::test]
async fn test_failing_backend_rejects_awaited_toggle() {
    let (synth, _) = synthesizer(RecordingBackend::new().failing());

    let Dispatched::Pending(pending) = synth
        .toggle(0x31, KeyDirection::Down, &ToggleOptions::default())
        .await
        .unwrap()
    else {
        panic!("async toggle must be pending");
    };

    assert!(matches!(pending.await, Err(SynthesisError::Dispatch(_))));
}

#[tokio::test]
async fn test_untranslatable_key_is_rejected_before_dispatch() {
    let (synth, backend) = synthesizer(RecordingBackend::new().with_scan_code(0x07, 0));

    let result = synth
        .toggle(
            0x07,
            KeyDirection::Down,
            &ToggleOptions::default().with_dispatch(DispatchMode::Sync),
        )
        .await;

    assert!(matches!(result, Err(SynthesisError::Untranslatable(0x07))));
    assert!(backend.records().is_empty());
}
