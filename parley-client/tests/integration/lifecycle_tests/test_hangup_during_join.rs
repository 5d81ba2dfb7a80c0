use parley_client::{CallEvent, CallState};
use std::time::Duration;

use crate::integration::{SELF_ID, init_tracing, start_call};
use crate::utils::{FakeMediaHost, MockSignalingTransport, TransportCall};

#[tokio::test(start_paused = true)]
async fn test_hangup_while_joining_call_leaves_relay() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.delay_join_call(Duration::from_secs(10)).await;
    let mut call = start_call(transport, FakeMediaHost::new());

    call.wait_for_state(CallState::JoiningCall).await;
    call.handle.hang_up().await.unwrap();
    call.wait_for(|e| *e == CallEvent::Closed).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(call.transport.count(&TransportCall::JoinCall).await, 0, "Join never completes");
    assert_eq!(
        call.transport.calls().await,
        vec![
            TransportCall::FetchIceServers,
            TransportCall::JoinRoom,
            TransportCall::LeaveCall,
            TransportCall::LeaveRoom,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_dispose_while_joining_call_leaves_relay() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.delay_join_call(Duration::from_secs(10)).await;
    let mut call = start_call(transport, FakeMediaHost::new());

    call.wait_for_state(CallState::JoiningCall).await;
    call.handle.dispose().await.unwrap();
    call.wait_for(|e| *e == CallEvent::Closed).await;
    call.task.await.unwrap();

    assert_eq!(call.transport.count(&TransportCall::JoinCall).await, 0);
    assert_eq!(call.transport.count(&TransportCall::LeaveCall).await, 1);
    assert_eq!(call.transport.count(&TransportCall::LeaveRoom).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_loss_while_joining_abandons_join() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.delay_join_call(Duration::from_secs(10)).await;
    let mut call = start_call(transport, FakeMediaHost::new());

    call.wait_for_state(CallState::JoiningCall).await;
    call.handle.connectivity_changed(false).await.unwrap();
    call.wait_for_state(CallState::Idle).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(call.transport.count(&TransportCall::JoinCall).await, 0);
    assert_eq!(call.transport.count(&TransportCall::LeaveCall).await, 0, "No leave on network loss");

    call.handle.connectivity_changed(true).await.unwrap();
    call.wait_for_state(CallState::InCall).await;

    assert_eq!(call.transport.count(&TransportCall::LeaveCall).await, 1, "Restart leaves first");
    assert_eq!(call.transport.count(&TransportCall::JoinCall).await, 1);
}
