use parley_client::{CallError, CallEvent, CallState, TransportError};

use crate::integration::{SELF_ID, init_tracing, start_call};
use crate::utils::{FakeMediaHost, MockSignalingTransport, TransportCall};

#[tokio::test(start_paused = true)]
async fn test_ice_fetch_failure_waits_for_connectivity() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport
        .push_ice_servers(Err(TransportError::Network("unreachable".to_owned())))
        .await;
    let mut call = start_call(transport, FakeMediaHost::new());

    let failed = call.wait_for(|e| matches!(e, CallEvent::Failed(_))).await;
    assert_eq!(
        failed,
        CallEvent::Failed(CallError::Transport(TransportError::Network("unreachable".to_owned())))
    );
    call.wait_for_state(CallState::Idle).await;
    assert_eq!(call.transport.count(&TransportCall::JoinRoom).await, 0);

    call.handle.connectivity_changed(true).await.unwrap();
    call.wait_for_state(CallState::InCall).await;
    assert_eq!(call.transport.count(&TransportCall::FetchIceServers).await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_join_asks_for_credentials() {
    init_tracing();

    let transport = MockSignalingTransport::new(SELF_ID);
    transport.push_ice_servers(Err(TransportError::Unauthorized)).await;
    let mut call = start_call(transport, FakeMediaHost::new());

    call.wait_for(|e| *e == CallEvent::AuthorizationRequired).await;
    call.wait_for_state(CallState::Idle).await;

    call.handle.hang_up().await.unwrap();
    call.wait_for(|e| *e == CallEvent::Closed).await;
    assert_eq!(call.transport.count(&TransportCall::LeaveCall).await, 0);
}
