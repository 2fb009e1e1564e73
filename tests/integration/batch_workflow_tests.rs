/*!
 * Batch tests over folders of transcripts
 */

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

use subnotes::app_config::Config;
use subnotes::app_controller::Controller;
use subnotes::providers::mock::MockProvider;
use subnotes::report::FileStatus;
use subnotes::translation::{
    BatchCoordinator, BatchOptions, CancellationSignal, NoopObserver, NotesPipeline, PipelineOptions,
};
use crate::common;

fn coordinator(provider: MockProvider, options: BatchOptions) -> BatchCoordinator {
    let pipeline_options = PipelineOptions {
        chunk_lines: 2,
        dispatch: common::fast_dispatch(2, 2),
        ..PipelineOptions::default()
    };
    BatchCoordinator::new(NotesPipeline::new(common::mock_translator(provider), pipeline_options), options)
}

/// One unreadable file fails alone; the report keeps input order
#[tokio::test]
async fn test_run_withUnreadableFile_shouldContinueWithOthers() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("in");
    fs::create_dir_all(&input)?;
    let mut files: Vec<PathBuf> = Vec::new();
    for n in 1..=4 {
        let path = input.join(format!("lecture {}.txt", n));
        if n == 2 {
            fs::write(&path, [0xc3, 0x28, b'\n'])?;
        } else {
            fs::write(&path, common::sample_transcript(n))?;
        }
        files.push(path);
    }
    let output = temp_dir.path().join("out");
    fs::create_dir_all(&output)?;

    let mut options = BatchOptions::new(&output);
    options.concurrent_files = 2;
    let report = coordinator(MockProvider::working(), options)
        .run(&files, &CancellationSignal::new(), &NoopObserver)
        .await;

    assert_eq!(report.len(), 4);
    let inputs: Vec<&PathBuf> = report.entries().iter().map(|entry| &entry.input).collect();
    assert_eq!(inputs, files.iter().collect::<Vec<_>>());
    let statuses: Vec<FileStatus> = report.entries().iter().map(|entry| entry.status).collect();
    assert_eq!(
        statuses,
        vec![FileStatus::Processed, FileStatus::Failed, FileStatus::Processed, FileStatus::Processed]
    );
    assert!(report.entries()[1].error.as_deref().unwrap_or_default().contains("UTF-8"));

    for n in [1, 3, 4] {
        assert!(output.join(format!("Lecture{}_Notes.md", n)).exists());
    }
    assert!(!output.join("Lecture2_Notes.md").exists());
    Ok(())
}

/// Files processed together draw on a single admission gate
#[tokio::test]
async fn test_run_withSharedGate_shouldBoundCallsAcrossFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let files: Vec<PathBuf> = (1..=3)
        .map(|n| common::create_test_file(temp_dir.path(), &format!("part{}.txt", n), &common::one_line_paragraphs(6)))
        .collect::<Result<_>>()?;
    let provider = MockProvider::slow(5);

    let mut options = BatchOptions::new(temp_dir.path().join("out"));
    options.concurrent_files = 3;
    options.shared_gate = Some(Arc::new(Semaphore::new(2)));
    fs::create_dir_all(&options.output_dir)?;

    let report = coordinator(provider.clone(), options)
        .run(&files, &CancellationSignal::new(), &NoopObserver)
        .await;

    assert_eq!(report.count(FileStatus::Processed), 3);
    assert!(provider.peak_in_flight() <= 2);
    Ok(())
}

/// Folder mode writes notes, the issue log and the JSON report
#[tokio::test]
async fn test_run_folder_withPartialFailure_shouldWriteReportAndIssueLog() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("transcripts");
    fs::create_dir_all(&input)?;
    common::create_test_file(&input, "Lecture 1.txt", &common::one_line_paragraphs(3))?;
    common::create_test_file(&input, "Lecture 2.txt", "Please reject me.\nThis one is fine.\n")?;
    let report_path = temp_dir.path().join("report.json");

    let mut config = Config::default();
    config.segmentation.chunk_lines = 1;
    config.translation.common.retry_count = 1;
    config.batch.report_file = Some(report_path.to_string_lossy().into_owned());
    let provider = MockProvider::working().with_failure_rule(|request| {
        request
            .text
            .contains("reject")
            .then(|| subnotes::ProviderError::from_status(422, "unprocessable"))
    });
    let controller = Controller::with_translator(config, common::mock_translator(provider));

    let report = controller.run_folder(input, None, false).await?;

    assert_eq!(report.count(FileStatus::Processed), 1);
    assert_eq!(report.count(FileStatus::Partial), 1);
    let processed = temp_dir.path().join("processed");
    let notes = fs::read_to_string(processed.join("Lecture2_Notes.md"))?;
    assert!(notes.contains("[Translation failed]"));
    assert!(notes.contains("[TRANSLATED] This one is fine."));
    let issues = fs::read_to_string(processed.join("subnotes.issues.log"))?;
    assert!(issues.contains("chunk 1 failed"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(json["entries"][1]["status"], "partial");
    Ok(())
}

/// Stopping during the reprocessing round leaves no notes behind
#[tokio::test]
async fn test_run_withCancelDuringReprocessing_shouldNotWriteNotes() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "lecture 1.txt", "Only line.\n")?;
    let output = temp_dir.path().join("out");
    fs::create_dir_all(&output)?;

    let provider = MockProvider::failing(503).with_delay(|_| 30);
    let pipeline_options = PipelineOptions {
        chunk_lines: 2,
        dispatch: common::fast_dispatch(1, 2),
        reprocess_failed: true,
        ..PipelineOptions::default()
    };
    let coordinator = BatchCoordinator::new(
        NotesPipeline::new(common::mock_translator(provider.clone()), pipeline_options),
        BatchOptions::new(&output),
    );

    let cancel = CancellationSignal::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            // Both first-round attempts are spent before the third call
            while provider.request_count() < 3 {
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
            cancel.cancel();
        })
    };

    let report = coordinator.run(&[input], &cancel, &NoopObserver).await;
    watcher.await?;

    assert_eq!(report.entries()[0].status, FileStatus::Cancelled);
    assert!(!output.join("Lecture1_Notes.md").exists());
    Ok(())
}
