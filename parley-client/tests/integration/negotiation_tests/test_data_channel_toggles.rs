use bytes::Bytes;
use parley_client::{CallEvent, PeerEvent};
use parley_core::SessionId;
use std::time::Duration;

use crate::integration::{SELF_ID, init_tracing, joined_call};
use crate::utils::{HostCall, MediaCall, MockSignalingTransport, roster};

#[tokio::test(start_paused = true)]
async fn test_remote_toggle_updates_peer() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.push_pull(Ok(vec![roster(&[(SELF_ID, true), ("z", true)])])).await;

    let mut call = joined_call(transport).await;
    let z = SessionId::from("z");
    call.wait_for(|e| *e == CallEvent::PeerJoined(z.clone())).await;

    call.factory
        .emit("z", PeerEvent::Message(z.clone(), Bytes::from_static(br#"{"type":"videoOff"}"#)))
        .await;
    call.wait_for(|e| *e == CallEvent::RemoteVideoChanged(z.clone(), false)).await;

    let summary = call.handle.peers().get(&z).unwrap();
    assert!(!summary.video_enabled);
    assert!(summary.audio_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_local_toggles_are_broadcast() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport
        .push_pull(Ok(vec![roster(&[(SELF_ID, true), ("y", true), ("z", true)])]))
        .await;

    let mut call = joined_call(transport).await;
    call.wait_for(|e| *e == CallEvent::PeerJoined(SessionId::from("z"))).await;

    call.handle.toggle_audio().await.unwrap();
    call.handle.toggle_video().await.unwrap();
    call.handle.switch_camera().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    for peer in ["y", "z"] {
        assert_eq!(
            call.factory.calls_for(peer).await,
            vec![
                MediaCall::Text(r#"{"type":"audioOff"}"#.to_owned()),
                MediaCall::Text(r#"{"type":"videoOff"}"#.to_owned()),
            ]
        );
    }
    assert_eq!(call.host.count(HostCall::AudioEnabled(false)), 1);
    assert_eq!(call.host.count(HostCall::VideoEnabled(false)), 1);
    assert_eq!(call.host.count(HostCall::SwitchCamera), 1);
}
