//! Lookups and roster broadcasts under a controlled clock

use std::sync::Arc;

use showsync::model::{ActorId, ChannelId};
use showsync::testing::EventLog;
use showsync::{
    ActorEvent, ChannelInfo, ChannelLookup, EventChannel, HostCommands, LoopbackHost,
    LOOKUP_DEBOUNCE,
};
use showsync_core::testing::{advance_time, pause_time};
use showsync_core::{assert_not_received, assert_received, count_received};

fn channel(n: u32) -> ChannelId {
    ChannelId::new(n).unwrap()
}

#[tokio::test]
async fn lookup_waits_for_quiet_period() {
    pause_time();
    let host = LoopbackHost::new();
    host.set_channel_info(
        channel(4),
        ChannelInfo {
            name: "Narrator".into(),
            color: None,
        },
    );
    let mut lookup = ChannelLookup::new(HostCommands::new(Arc::new(host)));

    lookup.set_input("4");
    advance_time(LOOKUP_DEBOUNCE / 2).await;
    assert_eq!(lookup.state().channel, None);

    advance_time(LOOKUP_DEBOUNCE).await;
    let mut state = lookup.subscribe();
    let settled = state
        .wait_for(|s| s.info.is_some())
        .await
        .expect("lookup alive")
        .clone();
    assert_eq!(settled.channel, Some(channel(4)));
    assert_eq!(settled.info.map(|info| info.name), Some("Narrator".to_owned()));
}

#[tokio::test]
async fn roster_broadcasts_reach_listeners_in_order() {
    let host = LoopbackHost::new();
    let bridge = Arc::new(host.clone());
    let log = EventLog::new();
    let sink = log.clone();
    let sub = EventChannel::<ActorEvent>::of()
        .listen(&bridge, move |event| sink.push(event))
        .await
        .unwrap();

    HostCommands::new(Arc::clone(&bridge))
        .import_actors(channel(1), channel(3))
        .await
        .unwrap();
    host.emit(&ActorEvent::Removed(ActorId(2)));
    log.wait_for_len(4).await;

    let events = log.snapshot();
    assert_eq!(count_received!(events, ActorEvent::Added(..)), 3);
    assert_received!(events, ActorEvent::Added(id, actor) if *id == ActorId(2) && actor.name == "Ch 2");
    assert_received!(events, ActorEvent::Removed(ActorId(2)));
    assert_not_received!(events, ActorEvent::Removed(ActorId(1)));
    assert!(matches!(events.last(), Some(ActorEvent::Removed(_))));

    sub.unlisten().await.unwrap();
}
