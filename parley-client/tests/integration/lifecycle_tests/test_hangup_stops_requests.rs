use parley_client::{CallEvent, CallState};
use parley_core::SessionId;
use std::time::Duration;

use crate::integration::{SELF_ID, init_tracing, joined_call};
use crate::utils::{HostCall, MockSignalingTransport, TransportCall, roster};

#[tokio::test(start_paused = true)]
async fn test_hangup_stops_requests() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.push_pull(Ok(vec![roster(&[(SELF_ID, true), ("z", true)])])).await;

    let mut call = joined_call(transport).await;
    call.wait_for(|e| *e == CallEvent::PeerJoined(SessionId::from("z"))).await;

    call.handle.hang_up().await.unwrap();
    call.wait_for_state(CallState::Leaving).await;
    call.wait_for(|e| *e == CallEvent::PeerLeft(SessionId::from("z"))).await;
    call.wait_for(|e| *e == CallEvent::Closed).await;

    let calls = call.transport.calls().await;
    assert_eq!(&calls[calls.len() - 2..], &[TransportCall::LeaveCall, TransportCall::LeaveRoom]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(call.transport.calls().await.len(), calls.len(), "No request after leaving");

    assert_eq!(call.factory.close_count("z").await, 1);
    assert_eq!(call.host.count(HostCall::Release), 1);
    assert!(call.handle.peers().is_empty());
    call.task.await.unwrap();
    assert!(call.handle.hang_up().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_dispose_leaves_and_closes() {
    init_tracing();

    let mut call = joined_call(MockSignalingTransport::new(SELF_ID)).await;

    call.handle.dispose().await.unwrap();
    call.wait_for(|e| *e == CallEvent::Closed).await;

    assert_eq!(call.transport.count(&TransportCall::LeaveCall).await, 1);
    assert_eq!(call.transport.count(&TransportCall::LeaveRoom).await, 1);
}
