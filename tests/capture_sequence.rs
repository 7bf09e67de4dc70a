use std::{io::Cursor, time::Duration};

use photobooth::{
    BoothError, CaptureMode, CaptureSequencer, CompositionConfig, Compositor, DirectoryCamera,
    FnCamera, ManualClock, OutputFormat, Progress, Status, TimerQueue, drive,
};

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([90, 60, 30]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Camera yielding frames 10, 20, 30... pixels wide so slot order is observable.
fn widening_camera() -> FnCamera<impl FnMut() -> Option<Vec<u8>>> {
    let mut n = 0;
    FnCamera(move || {
        n += 1;
        Some(png(10 * n, 8))
    })
}

#[test]
fn strip_fills_slots_in_capture_order() {
    let mut seq = CaptureSequencer::new(widening_camera());
    let mut clock = ManualClock::default();
    let done = drive(&mut seq, CaptureMode::Strip, &mut clock, |_| {}).unwrap();

    assert_eq!(done.mode, CaptureMode::Strip);
    let widths: Vec<u32> = done
        .slots
        .iter()
        .map(|s| s.as_ref().unwrap().width())
        .collect();
    assert_eq!(widths, vec![10, 20, 30]);
    assert!(seq.is_idle());
}

#[test]
fn strip_takes_three_countdowns_and_two_pauses() {
    let mut seq = CaptureSequencer::new(widening_camera());
    let mut clock = ManualClock::default();
    drive(&mut seq, CaptureMode::Strip, &mut clock, |_| {}).unwrap();

    let s = Duration::from_secs(1);
    let p = Duration::from_millis(500);
    assert_eq!(clock.sleeps, vec![s, s, s, p, s, s, s, p, s, s, s]);
    assert_eq!(clock.elapsed, Duration::from_secs(10));
}

#[test]
fn countdown_hits_zero_after_exactly_three_ticks() {
    let mut seq = CaptureSequencer::new(widening_camera());
    let mut clock = ManualClock::default();
    let mut seen: Vec<Progress> = Vec::new();
    let done = drive(&mut seq, CaptureMode::Single, &mut clock, |p| seen.push(*p)).unwrap();

    let countdowns: Vec<Option<u8>> = seen.iter().map(|p| p.countdown).collect();
    assert_eq!(countdowns, vec![Some(3), Some(2), Some(1), None]);
    assert_eq!(clock.sleeps, vec![Duration::from_secs(1); 3]);
    assert_eq!(seen.last().unwrap().status, Status::Idle);
    assert!(done.is_complete());
}

#[test]
fn missing_frame_leaves_slot_empty_and_sequence_continues() {
    let mut n = 0;
    let camera = FnCamera(move || {
        n += 1;
        (n != 2).then(|| png(16, 12))
    });
    let mut seq = CaptureSequencer::new(camera);
    let done = drive(
        &mut seq,
        CaptureMode::Strip,
        &mut ManualClock::default(),
        |_| {},
    )
    .unwrap();

    assert_eq!(done.slots.len(), 3);
    assert!(done.slots[0].is_some());
    assert!(done.slots[1].is_none());
    assert!(done.slots[2].is_some());
    assert_eq!(done.filled(), 2);

    let compositor = Compositor::new(CompositionConfig {
        show_label: false,
        ..CompositionConfig::default()
    })
    .unwrap();
    assert!(matches!(
        compositor.export_capture(&done),
        Err(BoothError::IncompleteCapture { slot: 1, total: 3 })
    ));
    // The placeholder still renders for preview.
    let preview = compositor.render(&done.slots).unwrap();
    assert_eq!((preview.width, preview.height), (228, 660));
}

#[test]
fn undecodable_frame_counts_as_missing() {
    let camera = FnCamera(|| Some(b"not an image".to_vec()));
    let mut seq = CaptureSequencer::new(camera);
    let done = seq.capture_now().unwrap();
    assert_eq!(done.slots.len(), 1);
    assert!(done.slots[0].is_none());
}

#[test]
fn stale_tick_after_exit_is_ignored() {
    let mut seq = CaptureSequencer::new(widening_camera());
    let mut q = TimerQueue::new();
    seq.start(CaptureMode::Strip, &mut q).unwrap();
    let (_, stale) = q.pop().unwrap();

    seq.exit();
    assert!(seq.is_idle());
    assert!(seq.session().slots().is_empty());

    assert!(seq.on_tick(stale, &mut q).is_none());
    assert!(q.is_empty());
    assert!(seq.is_idle());

    // A fresh run is unaffected by the discarded one.
    seq.start(CaptureMode::Single, &mut q).unwrap();
    assert_eq!(seq.status(), Status::CountingDown(3));
    assert!(seq.on_tick(stale, &mut q).is_none());
    assert_eq!(seq.status(), Status::CountingDown(3));
    assert_eq!(q.len(), 1);
}

#[test]
fn second_start_is_a_no_op() {
    let mut seq = CaptureSequencer::new(widening_camera());
    let mut q = TimerQueue::new();
    seq.start(CaptureMode::Single, &mut q).unwrap();
    let before = seq.progress();

    assert!(matches!(
        seq.start(CaptureMode::Strip, &mut q),
        Err(BoothError::SessionActive)
    ));
    assert_eq!(seq.progress(), before);
    assert_eq!(q.len(), 1);
}

#[test]
fn directory_camera_drives_a_full_strip_export() {
    let dir = tempfile::tempdir().unwrap();
    for (i, (w, h)) in [(64, 48), (48, 64), (50, 50)].into_iter().enumerate() {
        std::fs::write(dir.path().join(format!("frame{i}.png")), png(w, h)).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let camera = DirectoryCamera::open(dir.path()).unwrap();
    assert_eq!(camera.len(), 3);
    let mut seq = CaptureSequencer::new(camera);
    let done = drive(
        &mut seq,
        CaptureMode::Strip,
        &mut ManualClock::default(),
        |_| {},
    )
    .unwrap();
    let dims: Vec<(u32, u32)> = done
        .slots
        .iter()
        .flatten()
        .map(|f| (f.width(), f.height()))
        .collect();
    assert_eq!(dims, vec![(64, 48), (48, 64), (50, 50)]);

    let compositor = Compositor::new(CompositionConfig {
        show_label: false,
        format: OutputFormat::Png,
        ..CompositionConfig::default()
    })
    .unwrap();
    let out = compositor.export_capture(&done).unwrap();
    assert_eq!((out.width, out.height), (228, 660));
    assert_eq!(out.filename, "photobooth-strip.png");
}
