//! Tests for #[derive(KeyedVariant)] macro

#![allow(dead_code)]

use serde::Deserialize;
use serde_json::json;
use showsync::model::{ActorId, Cue, CueId};
use showsync::{dispatch_value, ActorEvent, HostEvent, KeyedVariant, Route, ShowEvent};

#[test]
fn test_tags_follow_variant_names() {
    #[derive(Debug, Deserialize, KeyedVariant)]
    enum Fader {
        Muted,
        Level(u8),
        Pair(u8, u8),
        Fade { to: u8, ms: u32 },
    }

    assert_eq!(Fader::TAGS, &["Muted", "Level", "Pair", "Fade"]);
    assert_eq!(Fader::Muted.tag(), "Muted");
    assert_eq!(Fader::Level(3).tag(), "Level");
    assert_eq!(Fader::Pair(1, 2).tag(), "Pair");
    assert_eq!(Fader::Fade { to: 0, ms: 10 }.tag(), "Fade");
}

#[test]
fn test_handler_receives_unwrapped_payload() {
    #[derive(Debug, Deserialize, KeyedVariant)]
    #[keyed(channel = "faderEvent")]
    enum FaderEvent {
        Muted,
        Level(u8),
        Pair(u8, u8),
        Fade { to: u8, ms: u32 },
    }

    #[derive(Default)]
    struct Calls(Vec<String>);

    impl FaderEventHandler for Calls {
        fn on_muted(&mut self, (): ()) {
            self.0.push("muted".into());
        }
        fn on_level(&mut self, level: u8) {
            self.0.push(format!("level {level}"));
        }
        fn on_pair(&mut self, (a, b): (u8, u8)) {
            self.0.push(format!("pair {a} {b}"));
        }
        fn on_fade(&mut self, (to, ms): (u8, u32)) {
            self.0.push(format!("fade {to} {ms}"));
        }
    }

    assert_eq!(FaderEvent::CHANNEL, "faderEvent");

    let mut calls = Calls::default();
    assert_eq!(
        dispatch_value::<FaderEvent, _>(json!({"Level": 90}), &mut calls).unwrap(),
        "Level"
    );
    assert_eq!(calls.0, vec!["level 90"]);

    dispatch_value::<FaderEvent, _>(json!({"Fade": {"to": 10, "ms": 300}}), &mut calls).unwrap();
    dispatch_value::<FaderEvent, _>(json!({"Pair": [1, 2]}), &mut calls).unwrap();
    dispatch_value::<FaderEvent, _>(json!("Muted"), &mut calls).unwrap();
    assert_eq!(
        calls.0,
        vec!["level 90", "fade 10 300", "pair 1 2", "muted"]
    );

    assert!(dispatch_value::<FaderEvent, _>(json!({"Solo": 1}), &mut calls).is_err());
    assert_eq!(calls.0.len(), 4);
}

#[test]
fn test_tag_override_and_handler_name() {
    #[derive(Debug, Deserialize, KeyedVariant)]
    #[keyed(handler = LinkHandler)]
    enum LinkEvent {
        #[serde(rename = "link-up")]
        #[keyed(tag = "link-up")]
        Up,
        Down(String),
    }

    struct Status(Option<String>);

    impl LinkHandler for Status {
        fn on_up(&mut self, (): ()) {
            self.0 = None;
        }
        fn on_down(&mut self, reason: String) {
            self.0 = Some(reason);
        }
    }

    assert_eq!(LinkEvent::TAGS, &["link-up", "Down"]);

    let event: LinkEvent = serde_json::from_value(json!("link-up")).unwrap();
    assert_eq!(event.tag(), "link-up");

    let mut status = Status(None);
    LinkEvent::Down("cable".into()).route(&mut status);
    assert_eq!(status.0.as_deref(), Some("cable"));
    event.route(&mut status);
    assert_eq!(status.0, None);
}

#[test]
fn test_show_channels() {
    assert_eq!(ShowEvent::CHANNEL, "showEvent");
    assert_eq!(ShowEvent::TAGS, &["Loaded", "CueAdded"]);
    assert_eq!(ActorEvent::CHANNEL, "actorEvent");
    assert_eq!(ActorEvent::Removed(ActorId(3)).tag(), "Removed");
}

#[test]
fn test_cue_added_wire_payload() {
    struct LastCue(Option<(u32, Cue)>);

    impl showsync::ShowEventHandler for LastCue {
        fn on_loaded(&mut self, _show: showsync::model::Show) {
            self.0 = None;
        }
        fn on_cue_added(&mut self, payload: (u32, Cue)) {
            self.0 = Some(payload);
        }
    }

    let cue = Cue::new(CueId::new(2, 0), "Cue 2.0");
    let payload = json!({"CueAdded": [1, serde_json::to_value(&cue).unwrap()]});

    let mut last = LastCue(None);
    dispatch_value::<ShowEvent, _>(payload, &mut last).unwrap();
    assert_eq!(last.0, Some((1, cue)));
}
