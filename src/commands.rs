use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use owo_colors::OwoColorize;
use vardecl::config::{write_config, VardeclConfig};
use vardecl::discover::discover_files;
use vardecl::output::{emit_success, is_quiet, OutputMode};
use vardecl::pipeline::{self, FileReport, Mode, PipelineOptions, Summary};
use vardecl::ui::{self, Icons, ProgressManager};
use vardecl::watcher::Watcher;
use vardecl::FileStatus;

pub fn run_fix(
    paths: &[PathBuf],
    stdout: bool,
    config: &VardeclConfig,
    output_mode: OutputMode,
) -> anyhow::Result<ExitCode> {
    let mode = if stdout { Mode::Stdout } else { Mode::Fix };
    let (reports, summary) = run_batch(paths, mode, config, output_mode)?;

    if output_mode.is_human() {
        if mode == Mode::Stdout {
            for report in &reports {
                match (&report.code, &report.error) {
                    (Some(code), _) => print!("{}", code),
                    (None, Some(error)) => ui::file_failed(&report.path.display().to_string(), error),
                    (None, None) => {}
                }
            }
        } else {
            print_reports(&reports, false);
            print_summary(&reports, &summary);
        }
    } else {
        emit_success(output_mode, "fix", serde_json::json!({
            "summary": summary,
            "files": reports,
        }))?;
    }

    Ok(if summary.failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

pub fn run_check(paths: &[PathBuf], config: &VardeclConfig, output_mode: OutputMode) -> anyhow::Result<ExitCode> {
    let (reports, summary) = run_batch(paths, Mode::Check, config, output_mode)?;

    if output_mode.is_human() {
        print_reports(&reports, true);
        print_summary(&reports, &summary);
        if summary.changed > 0 {
            ui::warn(&format!(
                "{} file(s) have undeclared assignments; run `vardecl fix` to declare them",
                summary.changed
            ));
        } else if summary.failed == 0 {
            ui::success("All assignments are declared");
        }
    } else {
        emit_success(output_mode, "check", serde_json::json!({
            "summary": summary,
            "files": reports,
        }))?;
    }

    Ok(if summary.changed > 0 || summary.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

pub fn run_watch(path: PathBuf, config: &VardeclConfig, output_mode: OutputMode) -> anyhow::Result<ExitCode> {
    if !path.is_dir() {
        anyhow::bail!("not a directory: {}", path.display());
    }

    let mut watcher = Watcher::new(path.clone(), config, config.source_maps)?;
    if output_mode.is_human() {
        ui::header("Watch mode");
        ui::status(Icons::EYE, "Directory", &path.display().to_string());
        ui::status(
            Icons::MAP,
            "Source maps",
            if config.source_maps { "on" } else { "off" },
        );
        println!("{}", ui::dim("Press Ctrl+C to stop"));
    }

    watcher.run(|report| {
        if output_mode.is_human() {
            print_report(report, false);
        } else if let Ok(line) = serde_json::to_string(report) {
            println!("{}", line);
        }
    })?;

    Ok(ExitCode::SUCCESS)
}

pub fn run_init(path: &Path, force: bool, output_mode: OutputMode) -> anyhow::Result<ExitCode> {
    write_config(path, &VardeclConfig::default(), force)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
    } else {
        emit_success(output_mode, "init", serde_json::json!({
            "path": path,
        }))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn run_batch(
    paths: &[PathBuf],
    mode: Mode,
    config: &VardeclConfig,
    output_mode: OutputMode,
) -> anyhow::Result<(Vec<FileReport>, Summary)> {
    let files = discover_files(paths, config)?;
    if files.is_empty() {
        tracing::warn!("no JavaScript files found");
    }

    let options = PipelineOptions {
        mode,
        source_maps: config.source_maps,
        jobs: config.worker_count(),
    };
    tracing::info!(files = files.len(), jobs = options.jobs, ?mode, "processing");

    let started = Instant::now();
    let show_progress = output_mode.is_human() && mode != Mode::Stdout && !is_quiet();
    let reports = if show_progress {
        let (mut progress, tx) = ProgressManager::new(files.len());
        let reports = pipeline::process_files(&files, &options, Some(&tx));
        drop(tx);
        let summary = Summary::of(&reports);
        progress.finish_with_summary(started.elapsed(), summary.files, summary.changed, summary.declared());
        reports
    } else {
        pipeline::process_files(&files, &options, None)
    };

    let summary = Summary::of(&reports);
    Ok((reports, summary))
}

fn declared_names(report: &FileReport) -> Vec<String> {
    report
        .stats
        .inlined
        .iter()
        .chain(&report.stats.hoisted)
        .cloned()
        .collect()
}

fn print_report(report: &FileReport, verbose_unchanged: bool) {
    let path = report.path.display().to_string();
    match report.status {
        FileStatus::Changed => {
            ui::file_modified(&path, &declared_names(report));
            if let Some(map_path) = &report.map_path {
                ui::map_written(&map_path.display().to_string());
            }
        }
        FileStatus::Unchanged if verbose_unchanged => ui::file_unchanged(&path),
        FileStatus::Unchanged => {}
        FileStatus::Failed => {
            ui::file_failed(&path, report.error.as_deref().unwrap_or("unknown error"));
        }
    }
}

fn print_reports(reports: &[FileReport], verbose_unchanged: bool) {
    if is_quiet() {
        return;
    }
    for report in reports {
        print_report(report, verbose_unchanged && tracing::enabled!(tracing::Level::DEBUG));
    }
}

fn print_summary(reports: &[FileReport], summary: &Summary) {
    if is_quiet() {
        return;
    }

    let table = ui::declarations_table(reports);
    if !table.is_empty() {
        ui::section("Declarations");
        println!("{}", table);
    }

    ui::section("Summary");
    let files = summary.files.to_string();
    let changed = summary.changed.to_string();
    let inlined = summary.inlined.to_string();
    let hoisted = summary.hoisted.to_string();
    let failed = summary.failed.to_string();
    println!(
        "{}",
        ui::stats_table(&[
            ("Files", &files),
            ("Changed", &changed),
            ("Inline declarations", &inlined),
            ("Hoisted declarations", &hoisted),
            ("Failed", &failed),
        ])
    );
    if summary.failed > 0 {
        println!(
            "{} {}",
            Icons::CROSS,
            format!("{} file(s) could not be processed", summary.failed).style(ui::theme().error)
        );
    }
}
