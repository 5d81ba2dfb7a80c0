use parley_client::{CallEvent, CallState};
use parley_core::SessionId;

use crate::integration::{SELF_ID, init_tracing, joined_call};
use crate::utils::{HostCall, MockSignalingTransport, TransportCall, roster};

#[tokio::test(start_paused = true)]
async fn test_network_loss_then_restart() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.push_pull(Ok(vec![roster(&[(SELF_ID, true), ("z", true)])])).await;

    let mut call = joined_call(transport).await;
    call.wait_for(|e| *e == CallEvent::PeerJoined(SessionId::from("z"))).await;

    call.handle.connectivity_changed(false).await.unwrap();
    call.wait_for(|e| *e == CallEvent::PeerLeft(SessionId::from("z"))).await;
    call.wait_for_state(CallState::Idle).await;

    assert_eq!(call.transport.count(&TransportCall::LeaveCall).await, 0, "No leave while offline");
    assert_eq!(call.host.count(HostCall::Release), 1);
    assert_eq!(call.factory.close_count("z").await, 1);

    call.handle.connectivity_changed(true).await.unwrap();
    call.wait_for_state(CallState::InCall).await;

    let calls = call.transport.calls().await;
    let rejoin: Vec<_> = calls
        .iter()
        .filter(|c| !matches!(c, TransportCall::Pull | TransportCall::Ping))
        .cloned()
        .collect();
    assert_eq!(
        rejoin,
        vec![
            TransportCall::FetchIceServers,
            TransportCall::JoinRoom,
            TransportCall::JoinCall,
            TransportCall::LeaveCall,
            TransportCall::LeaveRoom,
            TransportCall::FetchIceServers,
            TransportCall::JoinRoom,
            TransportCall::JoinCall,
        ]
    );
    assert_eq!(call.host.count(HostCall::StartCapture), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_regained_while_in_call_is_ignored() {
    init_tracing();

    let mut call = joined_call(MockSignalingTransport::new(SELF_ID)).await;
    call.handle.connectivity_changed(true).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;

    assert_eq!(call.transport.count(&TransportCall::JoinRoom).await, 1);
    assert!(
        call.drain()
            .iter()
            .all(|e| !matches!(e, CallEvent::StateChanged(_)))
    );
}
