use super::lamp::{SimLamp, SimScene};
use super::{SimDriver, SimHandle};
use crate::drivers::driver::LampDriver;
use crate::drivers::request::{self, SendError};
use crate::lamp::controller::{HsColor, Lamp, LampError, TurnOn};
use crate::protocol::cmd_defs::{StepDirection, END_OF_SCENES, PING};
use crate::utils::scene_table;
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEADLINE: Duration = Duration::from_millis(50);

fn test_chain() -> Vec<SimScene> {
    vec![
        SimScene::new(0, 3, "off"),
        SimScene::new(3, 7, "dim"),
        SimScene::new(7, END_OF_SCENES, "bright"),
    ]
}

fn sim(scenes: Vec<SimScene>) -> (Box<dyn LampDriver>, SimHandle) {
    let driver = SimDriver::new(SimLamp::new(scenes));
    let handle = driver.handle();
    (Box::new(driver), handle)
}

fn lamp(scenes: Vec<SimScene>) -> (Lamp, SimHandle) {
    let (driver, handle) = sim(scenes);
    (Lamp::with_deadline(driver, DEADLINE), handle)
}

#[tokio::test]
async fn ping_returns_api_version() {
    let (mut driver, _handle) = sim(test_chain());
    let reply = request::query(driver.as_mut(), PING(), DEADLINE).await.unwrap();
    assert_eq!(reply, [0x00, 0x02]);
}

#[tokio::test]
async fn table_follows_chain_order() {
    let (mut driver, _handle) = sim(test_chain());
    let table = scene_table::build(driver.as_mut(), DEADLINE).await.unwrap();
    let entries: Vec<(&str, u8)> = table
        .entries()
        .iter()
        .map(|e| (e.name.as_str(), e.id))
        .collect();
    assert_eq!(entries, [("off", 0), ("dim", 3), ("bright", 7)]);
}

#[tokio::test]
async fn table_ignores_chain_cycle() {
    let (mut driver, _handle) = sim(vec![
        SimScene::new(0, 3, "off"),
        SimScene::new(3, 0, "dim"),
    ]);
    let table = scene_table::build(driver.as_mut(), DEADLINE).await.unwrap();
    let entries: Vec<(&str, u8)> = table
        .entries()
        .iter()
        .map(|e| (e.name.as_str(), e.id))
        .collect();
    assert_eq!(entries, [("off", 0), ("dim", 3)]);
}

#[tokio::test]
async fn failed_descriptor_yields_partial_table() {
    let (mut driver, handle) = sim(test_chain());
    handle.with_lamp(|lamp| lamp.fail_descriptor = Some(7));
    let table = scene_table::build(driver.as_mut(), DEADLINE).await.unwrap();
    assert_eq!(
        table.names().collect::<Vec<_>>(),
        ["off", "dim"],
        "traversal should stop at the failing descriptor"
    );
}

#[tokio::test]
async fn silent_lamp_times_out_without_leaking_listener() {
    let (mut driver, handle) = sim(test_chain());
    handle.with_lamp(|lamp| lamp.silent = true);
    match request::query(driver.as_mut(), PING(), DEADLINE).await {
        Err(SendError::Timeout) => {}
        r => panic!("Expected timeout, got {:?}", r.map(|_| ())),
    }
    assert!(!handle.listener_armed());
    assert_eq!(handle.subscribe_count(), handle.unsubscribe_count());

    // A muted chain gives an empty, not failed, enumeration
    let table = scene_table::build(driver.as_mut(), DEADLINE).await.unwrap();
    assert!(table.is_empty());
    assert!(!handle.listener_armed());
}

#[tokio::test]
async fn double_arm_is_rejected() {
    let (mut driver, _handle) = sim(test_chain());
    let _rx = driver.subscribe_api().await.unwrap();
    assert!(driver.subscribe_api().await.is_err());
}

#[tokio::test]
async fn exchanges_pair_arm_and_disarm() {
    let (mut driver, handle) = sim(test_chain());
    for _ in 0..3 {
        request::query(driver.as_mut(), PING(), DEADLINE).await.unwrap();
    }
    assert_eq!(handle.subscribe_count(), 3);
    assert_eq!(handle.unsubscribe_count(), 3);
    assert!(!handle.listener_armed());
}

#[tokio::test]
async fn refresh_builds_table_and_maps_scene() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.with_lamp(|l| l.current_scene = 3);
    lamp.refresh().await.unwrap();
    assert_eq!(lamp.effects(), ["off", "dim", "bright"]);
    assert_eq!(lamp.effect(), Some("dim"));
    assert!(lamp.is_on());
}

#[tokio::test]
async fn turn_on_effect_sends_one_select_frame() {
    let (mut lamp, handle) = lamp(test_chain());
    lamp.refresh().await.unwrap();
    handle.clear_sent();
    lamp.turn_on(TurnOn {
        effect: Some("bright".to_string()),
        ..TurnOn::default()
    })
    .await
    .unwrap();
    assert_eq!(handle.sent(), [vec![0xa0, 0x02, 0x05, 0x07]]);
    assert_eq!(lamp.effect(), Some("bright"));
    assert!(lamp.is_on());
    assert_eq!(handle.with_lamp(|l| l.current_scene), 7);
}

#[tokio::test]
async fn turn_on_unknown_effect_sends_nothing() {
    let (mut lamp, handle) = lamp(test_chain());
    lamp.refresh().await.unwrap();
    handle.clear_sent();
    match lamp
        .turn_on(TurnOn {
            effect: Some("disco".to_string()),
            ..TurnOn::default()
        })
        .await
    {
        Err(LampError::UnknownEffect(name)) => assert_eq!(name, "disco"),
        r => panic!("Expected UnknownEffect, got {:?}", r.is_ok()),
    }
    assert!(handle.sent().is_empty());
}

#[tokio::test]
async fn turn_on_effect_supersedes_other_options() {
    let (mut lamp, handle) = lamp(test_chain());
    lamp.refresh().await.unwrap();
    handle.clear_sent();
    lamp.turn_on(TurnOn {
        effect: Some("dim".to_string()),
        brightness: Some(128),
        color_temp: Some(3000),
        ..TurnOn::default()
    })
    .await
    .unwrap();
    // Only the scene selection goes out
    assert_eq!(handle.sent(), [vec![0xa0, 0x02, 0x05, 0x03]]);
}

#[tokio::test]
async fn turn_off_selects_scene_zero() {
    let (mut lamp, handle) = lamp(test_chain());
    lamp.refresh().await.unwrap();
    lamp.turn_on(TurnOn::default()).await.unwrap();
    assert!(lamp.is_on());
    handle.clear_sent();
    lamp.turn_off().await.unwrap();
    assert_eq!(handle.sent(), [vec![0xa0, 0x02, 0x05, 0x00]]);
    assert_eq!(lamp.effect(), Some("off"));
    assert!(!lamp.is_on());
}

#[tokio::test]
async fn turn_on_default_selects_scene_255() {
    let (mut lamp, handle) = lamp(test_chain());
    lamp.refresh().await.unwrap();
    handle.clear_sent();
    lamp.turn_on(TurnOn::default()).await.unwrap();
    assert_eq!(handle.sent(), [vec![0xa0, 0x02, 0x05, 0xff]]);
    assert!(lamp.is_on());
}

#[tokio::test]
async fn turn_on_brightness_converts_to_percent() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.clear_sent();
    lamp.turn_on(TurnOn {
        brightness: Some(255),
        ..TurnOn::default()
    })
    .await
    .unwrap();
    assert_eq!(handle.sent(), [vec![0xa0, 0x01, 0x03, 0x64]]);
    assert_eq!(lamp.brightness(), 255);
    assert_eq!(handle.with_lamp(|l| l.brightness_pct), 100);
}

#[tokio::test]
async fn turn_on_color_then_temperature() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.clear_sent();
    lamp.turn_on(TurnOn {
        color: Some(HsColor {
            hue: 360,
            saturation: 100,
        }),
        color_temp: Some(5000),
        ..TurnOn::default()
    })
    .await
    .unwrap();
    let sent = handle.sent();
    assert_eq!(sent.len(), 2);
    // Hue 360deg and 100% saturation at full wire scale
    assert_eq!(
        sent[0],
        [0xa0, 0x01, 0x02, 0x01, 0x00, 0x00, 0xff, 0xff, 0xff, 0x64]
    );
    // 5000 K clamps to 4000 K
    assert_eq!(sent[1], [0xa0, 0x01, 0x02, 0x02, 0x00, 0x00, 0x0f, 0xa0, 0x64]);
    assert_eq!(lamp.color_temp(), Some(4000));
    assert_eq!(handle.with_lamp(|l| l.downlight), Some((4000, 100)));
    assert_eq!(handle.with_lamp(|l| l.uplight), Some((0xff, 0xffff, 100)));
}

#[tokio::test]
async fn set_both_uses_combined_frame() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.clear_sent();
    lamp.set_both(
        HsColor {
            hue: 0,
            saturation: 0,
        },
        2700,
        0,
    )
    .await
    .unwrap();
    assert_eq!(
        handle.sent(),
        [vec![0xa0, 0x01, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x64, 0x0a, 0x8c, 0x64]]
    );
    assert_eq!(handle.with_lamp(|l| l.downlight), Some((2700, 100)));
}

#[tokio::test]
async fn relative_brightness_is_fire_and_forget() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.with_lamp(|l| l.brightness_pct = 50);
    handle.clear_sent();
    lamp.adjust_brightness(-1).await.unwrap();
    assert_eq!(handle.sent(), [vec![0xa0, 0x02, 0x08, 0xff]]);
    assert_eq!(handle.with_lamp(|l| l.brightness_pct), 49);
    // No notification listener is armed for these
    assert_eq!(handle.subscribe_count(), 0);
}

#[tokio::test]
async fn scene_step_moves_along_chain() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.clear_sent();
    lamp.step_scene(StepDirection::Brighter).await.unwrap();
    assert_eq!(handle.sent(), [vec![0xa0, 0x02, 0x06, 0x01]]);
    assert_eq!(handle.with_lamp(|l| l.current_scene), 3);
    lamp.step_scene(StepDirection::Dimmer).await.unwrap();
    assert_eq!(handle.with_lamp(|l| l.current_scene), 0);
    assert_eq!(handle.subscribe_count(), 0);
}

#[tokio::test]
async fn lamp_ping_records_version() {
    let (mut lamp, handle) = lamp(test_chain());
    handle.with_lamp(|l| l.api_version = 3);
    assert_eq!(lamp.api_version(), None);
    assert_eq!(lamp.ping().await.unwrap(), 3);
    assert_eq!(lamp.api_version(), Some(3));
}

#[tokio::test]
async fn failed_set_keeps_previous_state() {
    let (mut lamp, handle) = lamp(test_chain());
    lamp.turn_on(TurnOn {
        brightness: Some(128),
        ..TurnOn::default()
    })
    .await
    .unwrap();
    handle.with_lamp(|l| l.silent = true);
    let res = lamp
        .turn_on(TurnOn {
            brightness: Some(10),
            ..TurnOn::default()
        })
        .await;
    assert!(matches!(res, Err(LampError::Timeout)));
    assert_eq!(lamp.brightness(), 128);
}

#[tokio::test]
async fn scene_stream_yields_in_order() {
    let (driver, _handle) = sim(test_chain());
    let driver = Arc::new(Mutex::new(driver));
    let items: Vec<_> = scene_table::scene_stream(driver, DEADLINE).collect().await;
    let names: Vec<String> = items
        .into_iter()
        .map(|item| item.unwrap().name)
        .collect();
    assert_eq!(names, ["off", "dim", "bright"]);
}
