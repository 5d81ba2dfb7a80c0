use parley_client::CallEvent;
use parley_core::{SessionId, SignalKind};
use std::time::Duration;

use crate::integration::{SELF_ID, init_tracing, joined_call};
use crate::utils::{MediaCall, MockSignalingTransport, roster};

#[tokio::test(start_paused = true)]
async fn test_initiator_sends_offer() {
    init_tracing();

    // "b" sorts before the local id, so this side offers; "z" offers to us.
    let transport = MockSignalingTransport::new(SELF_ID);
    transport.push_pull(Ok(vec![roster(&[(SELF_ID, true), ("b", true), ("z", true)])])).await;

    let mut call = joined_call(transport).await;
    call.wait_for(|e| *e == CallEvent::PeerJoined(SessionId::from("b"))).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(call.factory.calls_for("b").await, vec![MediaCall::CreateOffer]);
    assert!(call.factory.calls_for("z").await.is_empty());
    assert!(call.factory.params_for("b").await.unwrap().initiator);
    assert!(!call.factory.params_for("z").await.unwrap().initiator);

    let sent = call.transport.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind(), Ok(SignalKind::Offer));
    assert_eq!(sent[0].from, Some(SessionId::from(SELF_ID)));
    assert_eq!(sent[0].to, Some(SessionId::from("b")));
    assert_eq!(sent[0].nick(), Some("Mia"));
}
