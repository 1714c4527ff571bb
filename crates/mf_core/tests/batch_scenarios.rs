//! Batch template creation through the file-backed job channel.

use std::fs;
use std::io;
use std::path::PathBuf;

use mf_core::bank::{Template, TemplateBank};
use mf_core::config::Settings;
use mf_core::jobs::{
    read_progress, request_cancel, FileChannel, JobChannel, Progress, BUILD_PROGRESS_FILE,
    CANCEL_SENTINEL,
};
use mf_core::models::{linspace, ParameterGrid, Parameterization};
use mf_core::orchestrator::{BuildOptions, ItemOutcome, TemplateBatchBuilder};

/// Drops the cancel sentinel once `done` reaches `at`.
struct CancelAt {
    inner: FileChannel,
    dir: PathBuf,
    at: u64,
}

impl JobChannel for CancelAt {
    fn report(&self, progress: Progress) -> io::Result<()> {
        self.inner.report(progress)?;
        if progress.done == self.at {
            request_cancel(&self.dir)?;
        }
        Ok(())
    }

    fn is_cancel_requested(&self) -> bool {
        self.inner.is_cancel_requested()
    }

    fn acknowledge_cancel(&self) -> io::Result<()> {
        self.inner.acknowledge_cancel()
    }
}

fn tpl_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tpl"))
        .collect();
    names.sort();
    names
}

#[test]
fn all_combinations_of_one_pair_give_one_template() {
    let dir = tempfile::tempdir().unwrap();
    let builder = TemplateBatchBuilder::new(&Settings::default()).unwrap();
    let grid = ParameterGrid::cartesian(&[10.0, 10.0], &[10.0, 10.0]);
    let channel = FileChannel::for_build(dir.path());

    let report = builder
        .build(
            &grid,
            &BuildOptions::new(Parameterization::Individual, ""),
            dir.path(),
            &channel,
            None,
        )
        .unwrap()
        .into_inner();

    assert_eq!(tpl_files(dir.path()), vec!["mm_10-10.tpl"]);
    assert_eq!(report.created_count(), 1);
    let duplicates = report
        .outcomes
        .iter()
        .filter(|o| matches!(o, ItemOutcome::Duplicate { .. }))
        .count();
    assert_eq!(duplicates, 3);
    assert_eq!(
        read_progress(&dir.path().join(BUILD_PROGRESS_FILE)),
        Some(Progress::new(5, 5))
    );
}

#[test]
fn colliding_names_get_suffixes_and_both_domains_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let builder = TemplateBatchBuilder::new(&Settings::default()).unwrap();
    let grid = ParameterGrid::zipped(&[10.2, 9.8], &[5.0, 5.0]);
    let options = BuildOptions {
        time_domain: true,
        ..BuildOptions::new(Parameterization::Individual, "run")
    };

    let report = builder
        .build(&grid, &options, dir.path(), &FileChannel::for_build(dir.path()), None)
        .unwrap()
        .into_inner();

    assert_eq!(report.created_names(), vec!["runmm_10-5", "runmm_10-5_2"]);
    assert_eq!(tpl_files(dir.path()), vec!["runmm_10-5.tpl", "runmm_10-5_2.tpl"]);
    assert!(dir.path().join("runmm_10-5_2.wav").exists());

    let loaded = Template::load(&dir.path().join("runmm_10-5_2.tpl")).unwrap();
    assert_eq!(loaded.masses.m1, 9.8);
    assert_eq!(loaded.buffer_len(), 4096);
}

#[test]
fn chirp_ratio_grid_loads_back_as_a_bank() {
    let dir = tempfile::tempdir().unwrap();
    let builder = TemplateBatchBuilder::new(&Settings::default()).unwrap();
    let grid = ParameterGrid::cartesian(&linspace(10.0, 20.0, 2), &[0.5, 1.0]);

    let report = builder
        .build(
            &grid,
            &BuildOptions::new(Parameterization::ChirpRatio, ""),
            dir.path(),
            &FileChannel::for_build(dir.path()),
            None,
        )
        .unwrap()
        .into_inner();
    assert_eq!(report.failed_count(), 0);

    let bank = TemplateBank::from_paths(&[dir.path()]).unwrap();
    assert_eq!(bank.len(), report.created_count());
    for template in &bank {
        assert!(template.name.starts_with("McR_"));
        assert!(template.masses.m1 >= template.masses.m2);
        assert!(template.sigma() > 0.0);
    }
}

#[test]
fn request_during_the_last_item_is_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let builder = TemplateBatchBuilder::new(&Settings::default()).unwrap();
    let grid = ParameterGrid::zipped(&[10.0, 20.0], &[10.0, 15.0]);
    let options = BuildOptions::new(Parameterization::Individual, "");

    // done reaches 2 right after the second item's cancel check
    let channel = CancelAt {
        inner: FileChannel::for_build(dir.path()),
        dir: dir.path().to_path_buf(),
        at: 2,
    };
    let first = builder
        .build(&grid, &options, dir.path(), &channel, None)
        .unwrap();
    assert!(!first.is_cancelled());
    assert_eq!(first.value().created_count(), 2);
    assert!(!dir.path().join(CANCEL_SENTINEL).exists());

    let second = builder
        .build(
            &ParameterGrid::zipped(&[30.0], &[25.0]),
            &options,
            dir.path(),
            &FileChannel::for_build(dir.path()),
            None,
        )
        .unwrap();
    assert!(!second.is_cancelled());
    assert_eq!(second.value().created_count(), 1);
}
