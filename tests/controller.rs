mod common;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::*;
use helmet_sentinel::controller::Session;
use helmet_sentinel::input::{CaptureError, InputSource};

fn ten_frame_video() -> Vec<helmet_sentinel::input::Frame> {
    (1..=10).map(numbered_frame).collect()
}

fn run_to_end(controller: &mut helmet_sentinel::Controller<RecordingDisplay>, ticks: usize) {
    for _ in 0..ticks {
        controller.tick();
    }
}

#[test]
fn ten_frame_video_logs_two_hardhat_lines_and_draws_their_boxes() {
    let opener = ScriptedOpener::with_file("site.mp4", ten_frame_video());
    let mut by_frame = HashMap::new();
    by_frame.insert(3, vec![hardhat(100, 120, 220, 260)]);
    by_frame.insert(5, vec![person(10, 10, 50, 90)]);
    by_frame.insert(7, vec![hardhat(300, 200, 420, 330)]);
    let model = ScriptedModel {
        by_frame,
        ..Default::default()
    };

    let mut controller = controller(opener, model, 0);
    assert!(controller.start_file("site.mp4"));
    run_to_end(&mut controller, 10);

    let log = messages(controller.log());
    assert_eq!(log[0], "视频文件已启动");
    let summaries: Vec<_> = log.iter().filter(|m| m.starts_with("检测到")).collect();
    assert_eq!(
        summaries,
        ["检测到 Hardhat: 1, NO-Hardhat: 0", "检测到 Hardhat: 1, NO-Hardhat: 0"]
    );

    let display = controller.display();
    let raw = display.raw();
    let annotated = display.annotated();
    assert_eq!(raw.len(), 10);
    assert_eq!(annotated.len(), 10);

    for (raw, annotated) in raw.iter().zip(&annotated) {
        match frame_number(raw) {
            3 => {
                assert_eq!(*annotated.get_pixel(100, 120), BLUE);
                assert_eq!(*annotated.get_pixel(220, 260), BLUE);
                assert_eq!(*annotated.get_pixel(160, 120), BLUE);
                assert_eq!(*annotated.get_pixel(160, 190), BACKGROUND);
                assert_eq!(*annotated.get_pixel(300, 200), BACKGROUND);
            }
            7 => {
                assert_eq!(*annotated.get_pixel(300, 200), BLUE);
                assert_eq!(*annotated.get_pixel(420, 330), BLUE);
                assert_eq!(*annotated.get_pixel(100, 120), BACKGROUND);
            }
            // Person 框被过滤, 不绘制
            _ => assert_eq!(raw, annotated),
        }
    }
}

#[test]
fn raw_panel_does_not_depend_on_detections() {
    let frames = ten_frame_video();
    let mut by_frame = HashMap::new();
    by_frame.insert(2, vec![hardhat(0, 0, 639, 479)]);

    let mut with_boxes = controller(
        ScriptedOpener::with_file("a.mp4", frames.clone()),
        ScriptedModel {
            by_frame,
            ..Default::default()
        },
        0,
    );
    let mut without_boxes = controller(
        ScriptedOpener::with_file("a.mp4", frames.clone()),
        ScriptedModel::default(),
        0,
    );
    with_boxes.start_file("a.mp4");
    without_boxes.start_file("a.mp4");
    run_to_end(&mut with_boxes, 10);
    run_to_end(&mut without_boxes, 10);

    assert_eq!(with_boxes.display().raw(), without_boxes.display().raw());
    assert_ne!(
        with_boxes.display().annotated(),
        without_boxes.display().annotated()
    );
    let expected: Vec<_> = frames.iter().collect();
    assert_eq!(with_boxes.display().raw(), expected);
}

#[test]
fn frames_are_resized_to_display_size() {
    let big = image::RgbImage::from_pixel(1280, 720, BACKGROUND);
    let mut controller = controller(
        ScriptedOpener::with_camera(vec![Ok(big)]),
        ScriptedModel::default(),
        0,
    );
    assert!(controller.start_camera());
    controller.tick();
    let raw = controller.display().raw();
    assert_eq!(raw[0].dimensions(), (WIDTH, HEIGHT));
}

#[test]
fn unopenable_camera_logs_once_and_stays_idle() {
    let mut controller = controller(ScriptedOpener::default(), ScriptedModel::default(), 0);

    assert!(!controller.start_camera());
    assert!(!controller.is_running());
    assert_eq!(messages(controller.log()), ["无法打开摄像头"]);
    assert!(controller.display().events.is_empty());

    // 没有会话时定时器不会触发
    assert!(!controller.poll(Instant::now()));
    assert!(controller.display().events.is_empty());
}

#[test]
fn unopenable_file_logs_failure() {
    let mut controller = controller(ScriptedOpener::default(), ScriptedModel::default(), 0);
    assert!(!controller.start_file("missing.avi"));
    assert_eq!(messages(controller.log()), ["无法打开视频文件"]);
    assert!(matches!(controller.session(), Session::Idle));
}

#[test]
fn stop_releases_handle_and_is_idempotent() {
    let opener = ScriptedOpener::with_camera(vec![Ok(numbered_frame(1))]);
    let releases = opener.releases.clone();
    let mut controller = controller(opener, ScriptedModel::default(), 0);

    controller.start_camera();
    controller.tick();
    controller.stop();
    assert_eq!(releases.get(), 1);
    assert!(!controller.is_running());

    controller.stop();
    controller.stop();
    assert_eq!(releases.get(), 1);
    assert_eq!(controller.display().clears(), 3);
    assert_eq!(
        messages(controller.log()),
        ["摄像头已启动", "摄像头或视频文件已停止"]
    );
}

#[test]
fn restarting_releases_previous_handle() {
    let opener = ScriptedOpener::with_file("a.mp4", ten_frame_video());
    opener.files.borrow_mut().insert("b.mp4".into(), ten_frame_video());
    let releases = opener.releases.clone();
    let opened = opener.opened.clone();
    let mut controller = controller(opener, ScriptedModel::default(), 0);

    controller.start_file("a.mp4");
    controller.start_file("b.mp4");
    assert_eq!(opened.get(), 2);
    assert_eq!(releases.get(), 1);
    match controller.session() {
        Session::Running(active) => {
            assert_eq!(active.input(), &InputSource::File("b.mp4".into()))
        }
        Session::Idle => panic!("should be running"),
    }

    // 打开失败时旧句柄同样已释放
    controller.start_file("missing.mp4");
    assert_eq!(releases.get(), 2);
    assert!(!controller.is_running());
}

#[test]
fn read_failures_are_logged_and_session_kept_when_unlimited() {
    let opener = ScriptedOpener::with_camera(vec![
        Err(CaptureError::Timeout),
        Ok(numbered_frame(1)),
    ]);
    let mut controller = controller(opener, ScriptedModel::default(), 0);
    controller.start_camera();

    run_to_end(&mut controller, 5);
    assert!(controller.is_running());
    let failures = messages(controller.log())
        .iter()
        .filter(|m| *m == "无法读取帧")
        .count();
    // 1 次超时 + 流结束后 3 次
    assert_eq!(failures, 4);
    assert_eq!(controller.display().raw().len(), 1);
}

#[test]
fn consecutive_read_failures_auto_stop() {
    let opener = ScriptedOpener::with_file("short.mp4", vec![numbered_frame(1)]);
    let releases = opener.releases.clone();
    let mut controller = controller(opener, ScriptedModel::default(), 3);
    controller.start_file("short.mp4");

    run_to_end(&mut controller, 10);
    assert!(!controller.is_running());
    assert_eq!(releases.get(), 1);
    assert_eq!(
        messages(controller.log()),
        [
            "视频文件已启动",
            "无法读取帧",
            "无法读取帧",
            "无法读取帧",
            "连续读取失败 3 次，已自动停止",
            "摄像头或视频文件已停止",
        ]
    );
    assert_eq!(controller.display().clears(), 1);
}

#[test]
fn detection_failure_skips_annotation_for_that_frame() {
    let model = ScriptedModel {
        fail_on: Some(2),
        ..Default::default()
    };
    let opener = ScriptedOpener::with_file("a.mp4", (1..=3).map(numbered_frame).collect());
    let mut controller = controller(opener, model, 0);
    controller.start_file("a.mp4");
    run_to_end(&mut controller, 3);

    assert!(controller.is_running());
    let display = controller.display();
    assert_eq!(display.raw().len(), 3);
    let annotated: Vec<u8> = display.annotated().iter().map(|f| frame_number(f)).collect();
    assert_eq!(annotated, [1, 2, 3]);
    // 失败的那一帧: 处理后画面就是原始画面, 没有检测框
    assert_eq!(display.annotated()[1], display.raw()[1]);
    assert!(messages(controller.log())
        .iter()
        .any(|m| m.starts_with("检测失败: ") && m.contains("第 2 帧")));
}

#[test]
fn poll_follows_tick_interval() {
    let opener = ScriptedOpener::with_file("a.mp4", ten_frame_video());
    let mut controller = controller(opener, ScriptedModel::default(), 0);
    controller.start_file("a.mp4");

    let t0 = Instant::now();
    assert!(controller.poll(t0));
    assert!(!controller.poll(t0 + Duration::from_millis(5)));
    assert!(controller.poll(t0 + Duration::from_millis(30)));
    assert_eq!(controller.display().raw().len(), 2);
}

#[test]
fn annotated_panel_tracks_raw_panel_even_when_detection_fails() {
    let model = ScriptedModel {
        fail_on: Some(2),
        ..Default::default()
    };
    let opener = ScriptedOpener::with_file("a.mp4", (1..=2).map(numbered_frame).collect());
    let mut controller = controller(opener, model, 0);
    controller.start_file("a.mp4");
    controller.tick();
    controller.tick();

    let display = controller.display();
    let last_raw = display.raw().last().map(|f| frame_number(f));
    let last_annotated = display.annotated().last().map(|f| frame_number(f));
    assert_eq!(last_raw, Some(2));
    assert_eq!(last_annotated, Some(2));
}

#[test]
fn undecodable_frames_count_towards_auto_stop() {
    let empty = image::RgbImage::new(0, 0);
    let opener = ScriptedOpener::with_camera(vec![
        Ok(empty.clone()),
        Ok(empty.clone()),
        Ok(empty),
        Ok(numbered_frame(1)),
    ]);
    let releases = opener.releases.clone();
    let mut controller = controller(opener, ScriptedModel::default(), 3);
    controller.start_camera();

    run_to_end(&mut controller, 3);
    assert!(!controller.is_running());
    assert_eq!(releases.get(), 1);
    assert!(controller.display().raw().is_empty());
    assert!(messages(controller.log())
        .iter()
        .any(|m| m == "连续读取失败 3 次，已自动停止"));
}

#[test]
fn a_good_frame_resets_the_failure_count() {
    let opener = ScriptedOpener::with_camera(vec![
        Err(CaptureError::Timeout),
        Err(CaptureError::Timeout),
        Ok(numbered_frame(1)),
        Err(CaptureError::Timeout),
        Err(CaptureError::Timeout),
        Ok(numbered_frame(2)),
    ]);
    let mut controller = controller(opener, ScriptedModel::default(), 3);
    controller.start_camera();

    run_to_end(&mut controller, 6);
    assert!(controller.is_running());
    assert_eq!(controller.display().raw().len(), 2);
}
