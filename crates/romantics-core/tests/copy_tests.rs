use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use romantics_core::copier::collision::CollisionPolicy;
use romantics_core::copier::{plan_collisions, JobStatus};
use romantics_core::space::FixedSpace;
use romantics_core::{copy_files, start_copy, CopyEvent, CopyOptions, CopyOutcome, CopyTask, Error};

fn write_file(dir: &Path, name: &str, len: usize, byte: u8) -> CopyTask {
    let path = dir.join(name);
    fs::write(&path, vec![byte; len]).unwrap();
    CopyTask::from_path(&path).unwrap()
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_insufficient_space_copies_nothing() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let tasks = vec![
        write_file(src.path(), "a.bin", 100, 1),
        write_file(src.path(), "b.bin", 200, 2),
    ];

    let mut events = Vec::new();
    let outcome = copy_files(
        &tasks,
        dest.path(),
        &CopyOptions::default(),
        &FixedSpace(250),
        &AtomicBool::new(false),
        &mut |e| events.push(e),
    );

    match outcome {
        CopyOutcome::Failed { error, summary } => {
            match error {
                Error::InsufficientSpace {
                    required,
                    available,
                    ..
                } => {
                    assert_eq!(required, 300);
                    assert_eq!(available, 250);
                }
                other => panic!("unexpected error {:?}", other),
            }
            assert_eq!(summary.bytes_copied, 0);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(events.is_empty());
    assert!(dir_names(dest.path()).is_empty());
}

#[test]
fn test_space_check_can_be_disabled() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let tasks = vec![write_file(src.path(), "a.bin", 100, 1)];

    let options = CopyOptions {
        check_space: false,
        ..Default::default()
    };
    let outcome = copy_files(
        &tasks,
        dest.path(),
        &options,
        &FixedSpace(0),
        &AtomicBool::new(false),
        &mut |_| {},
    );
    assert_eq!(outcome.status(), JobStatus::Completed);
}

#[test]
fn test_auto_suffix_keeps_existing_file() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(dest.path().join("fileA.ext"), b"original").unwrap();
    let tasks = vec![write_file(src.path(), "fileA.ext", 10, 7)];

    let outcome = copy_files(
        &tasks,
        dest.path(),
        &CopyOptions::default(),
        &FixedSpace(u64::MAX),
        &AtomicBool::new(false),
        &mut |_| {},
    );

    let summary = match outcome {
        CopyOutcome::Completed(summary) => summary,
        other => panic!("expected completion, got {:?}", other),
    };
    assert_eq!(summary.copied[0].1, dest.path().join("fileA_1.ext"));
    assert_eq!(fs::read(dest.path().join("fileA.ext")).unwrap(), b"original");
    assert_eq!(fs::read(dest.path().join("fileA_1.ext")).unwrap(), vec![7u8; 10]);
}

#[test]
fn test_collision_policies() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(dest.path().join("skip.bin"), b"old").unwrap();
    fs::write(dest.path().join("over.bin"), b"old").unwrap();
    let tasks = vec![
        write_file(src.path(), "skip.bin", 4, 1).with_collision(CollisionPolicy::Skip),
        write_file(src.path(), "over.bin", 4, 2).with_collision(CollisionPolicy::Overwrite),
    ];

    let planned = plan_collisions(&tasks, dest.path());
    assert_eq!(planned.len(), 2);

    let mut skipped_events = 0;
    let outcome = copy_files(
        &tasks,
        dest.path(),
        &CopyOptions::default(),
        &FixedSpace(u64::MAX),
        &AtomicBool::new(false),
        &mut |e| {
            if matches!(e, CopyEvent::FileSkipped { .. }) {
                skipped_events += 1;
            }
        },
    );

    assert_eq!(outcome.status(), JobStatus::Completed);
    assert_eq!(outcome.summary().skipped, vec![src.path().join("skip.bin")]);
    assert_eq!(skipped_events, 1);
    assert_eq!(fs::read(dest.path().join("skip.bin")).unwrap(), b"old");
    assert_eq!(fs::read(dest.path().join("over.bin")).unwrap(), vec![2u8; 4]);
    assert_eq!(dir_names(dest.path()), vec!["over.bin", "skip.bin"]);
}

#[test]
fn test_fail_policy_stops_the_job() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    fs::write(dest.path().join("b.bin"), b"old").unwrap();
    let tasks = vec![
        write_file(src.path(), "a.bin", 4, 1),
        write_file(src.path(), "b.bin", 4, 2),
        write_file(src.path(), "c.bin", 4, 3),
    ];
    let options = CopyOptions {
        collision: CollisionPolicy::Fail,
        ..Default::default()
    };

    let outcome = copy_files(
        &tasks,
        dest.path(),
        &options,
        &FixedSpace(u64::MAX),
        &AtomicBool::new(false),
        &mut |_| {},
    );

    match outcome {
        CopyOutcome::Failed { error, summary } => {
            assert!(matches!(error, Error::Collision { .. }));
            assert_eq!(summary.files_copied(), 1);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(dir_names(dest.path()), vec!["a.bin", "b.bin"]);
    assert_eq!(fs::read(dest.path().join("b.bin")).unwrap(), b"old");
}

#[test]
fn test_cancel_mid_file_leaves_no_partial() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let tasks = vec![
        write_file(src.path(), "first.bin", 1000, 1),
        write_file(src.path(), "big.bin", 10 * 1024 * 1024, 2),
        write_file(src.path(), "never.bin", 1000, 3),
    ];
    let options = CopyOptions {
        chunk_size: 64 * 1024,
        progress_interval: Duration::ZERO,
        ..Default::default()
    };

    let cancel = AtomicBool::new(false);
    let mut last_progress = 0;
    let outcome = copy_files(
        &tasks,
        dest.path(),
        &options,
        &FixedSpace(u64::MAX),
        &cancel,
        &mut |e| {
            if let CopyEvent::Progress(p) = e {
                last_progress = p.bytes_copied;
                if p.current_file == "big.bin" && p.file_bytes_copied >= 4 * 1024 * 1024 {
                    cancel.store(true, Ordering::Relaxed);
                }
            }
        },
    );

    let summary = match outcome {
        CopyOutcome::Cancelled(summary) => summary,
        other => panic!("expected cancellation, got {:?}", other),
    };
    assert_eq!(summary.files_copied(), 1);
    assert!(last_progress >= 4 * 1024 * 1024);
    assert!(last_progress < 10 * 1024 * 1024);
    assert_eq!(dir_names(dest.path()), vec!["first.bin"]);
    assert_eq!(fs::read(dest.path().join("first.bin")).unwrap(), vec![1u8; 1000]);
}

#[test]
fn test_rerun_after_failure_is_safe() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let good = write_file(src.path(), "good.bin", 50, 1);
    let tasks = vec![good.clone(), CopyTask::new(src.path().join("gone.bin"), 50)];

    let first = copy_files(
        &tasks,
        dest.path(),
        &CopyOptions::default(),
        &FixedSpace(u64::MAX),
        &AtomicBool::new(false),
        &mut |_| {},
    );
    assert_eq!(first.status(), JobStatus::Failed);
    assert_eq!(dir_names(dest.path()), vec!["good.bin"]);

    let options = CopyOptions {
        collision: CollisionPolicy::Skip,
        ..Default::default()
    };
    let second = copy_files(
        &[good],
        dest.path(),
        &options,
        &FixedSpace(u64::MAX),
        &AtomicBool::new(false),
        &mut |_| {},
    );
    assert_eq!(second.status(), JobStatus::Completed);
    assert_eq!(second.summary().skipped.len(), 1);
    assert_eq!(dir_names(dest.path()), vec!["good.bin"]);
}

#[test]
fn test_background_job_reports_in_order() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let tasks: Vec<CopyTask> = (0..5)
        .map(|i| write_file(src.path(), &format!("song{}.mp3", i), 20_000, i as u8))
        .collect();
    let options = CopyOptions {
        chunk_size: 4096,
        progress_interval: Duration::ZERO,
        ..Default::default()
    };

    let job = start_copy(
        tasks,
        dest.path().join("music"),
        options,
        Arc::new(FixedSpace(u64::MAX)),
    )
    .unwrap();

    let events: Vec<CopyEvent> = job.events().iter().collect();
    let outcome = job.wait();
    assert_eq!(outcome.status(), JobStatus::Completed);
    assert_eq!(outcome.summary().bytes_copied, 100_000);

    assert!(matches!(
        events.first(),
        Some(CopyEvent::Started {
            total_files: 5,
            total_bytes: 100_000
        })
    ));
    assert!(matches!(
        events.last(),
        Some(CopyEvent::Finished {
            status: JobStatus::Completed,
            message: None
        })
    ));

    let mut last_bytes = 0;
    let mut completed = 0;
    for event in &events {
        match event {
            CopyEvent::Progress(p) => {
                assert!(p.bytes_copied >= last_bytes);
                assert!(p.bytes_copied <= p.total_bytes);
                last_bytes = p.bytes_copied;
            }
            CopyEvent::FileCompleted {
                files_completed, ..
            } => {
                completed += 1;
                assert_eq!(*files_completed, completed);
            }
            _ => {}
        }
    }
    assert_eq!(completed, 5);
    assert_eq!(dir_names(&dest.path().join("music")).len(), 5);
}

#[test]
fn test_background_job_failure_message() {
    let dest = tempdir().unwrap();
    let job = start_copy(
        vec![CopyTask::new("/no/such/dir/x.rom", 10)],
        dest.path().to_path_buf(),
        CopyOptions::default(),
        Arc::new(FixedSpace(u64::MAX)),
    )
    .unwrap();

    let events: Vec<CopyEvent> = job.events().iter().collect();
    assert_eq!(job.wait().status(), JobStatus::Failed);
    match events.last() {
        Some(CopyEvent::Finished {
            status: JobStatus::Failed,
            message: Some(message),
        }) => assert!(message.contains("x.rom")),
        other => panic!("unexpected last event {:?}", other),
    }
}

#[test]
fn test_cancel_running_job_from_observer() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = write_file(src.path(), "first.bin", 1000, 1);
    // well past what the worker can queue ahead of the observer
    let big = write_file(src.path(), "big.bin", 4 * 1024 * 1024, 2);
    let options = CopyOptions {
        chunk_size: 4096,
        progress_interval: Duration::ZERO,
        ..Default::default()
    };

    let job = start_copy(
        vec![first, big],
        dest.path().to_path_buf(),
        options,
        Arc::new(FixedSpace(u64::MAX)),
    )
    .unwrap();

    let mut events = Vec::new();
    for event in job.events().iter() {
        if let CopyEvent::Progress(p) = &event {
            if p.current_file == "big.bin" && p.file_bytes_copied >= 512 * 1024 {
                job.cancel();
            }
        }
        events.push(event);
    }
    assert!(job.is_cancelled());

    let outcome = job.wait();
    assert_eq!(outcome.status(), JobStatus::Cancelled);
    assert_eq!(outcome.summary().files_copied(), 1);
    // no partial or finished copy of the interrupted file
    assert_eq!(dir_names(dest.path()), vec!["first.bin"]);
    assert!(matches!(
        events.last(),
        Some(CopyEvent::Finished {
            status: JobStatus::Cancelled,
            message: None
        })
    ));
}

#[test]
fn test_cancel_token_is_shared_with_the_job() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let task = write_file(src.path(), "a.bin", 10, 1);

    let job = start_copy(
        vec![task],
        dest.path().to_path_buf(),
        CopyOptions::default(),
        Arc::new(FixedSpace(u64::MAX)),
    )
    .unwrap();
    let token = job.cancel_token();
    assert!(!job.is_cancelled());
    token.store(true, Ordering::SeqCst);
    assert!(job.is_cancelled());
    job.wait();
}
