//! CLI tool for extracting slide script text from PowerPoint files.
//!
//! Scans a directory for `.pptx`/`.ppt` files and writes one Excel report per
//! file with the text found inside a region of the selected slides.

mod reader;
mod xlsx;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use reader::FormatReader;
use slidescript_core::{discover_documents, BatchRunner, BatchSummary, Rect, RegionExtractor, TextNormalizer};
use std::io::BufRead;
use std::path::PathBuf;
use xlsx::XlsxReportWriter;

/// Extract caption text from a region of selected slides into Excel reports.
#[derive(Parser, Debug)]
#[command(name = "slidescript")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to scan for .pptx/.ppt files (not recursive)
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Output directory for reports (default: the scanned directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Zero-based slide indices to read, comma separated
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "0,1,2,3,4",
        allow_negative_numbers = true
    )]
    slides: Vec<i64>,

    /// Left edge of the region in inches
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x_min: f64,

    /// Top edge of the region in inches
    #[arg(long, default_value_t = 5.673, allow_negative_numbers = true)]
    y_min: f64,

    /// Right edge of the region in inches
    #[arg(long, default_value_t = 10.1, allow_negative_numbers = true)]
    x_max: f64,

    /// Bottom edge of the region in inches
    #[arg(long, default_value_t = 7.005, allow_negative_numbers = true)]
    y_max: f64,

    /// Extra label to strip from texts, like "내레이션:" (repeatable)
    #[arg(long = "strip-label", value_name = "LABEL")]
    strip_labels: Vec<String>,

    /// Wait for Enter before exiting
    #[arg(short, long)]
    wait: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = run(&args);

    if args.wait {
        wait_for_enter();
    }

    result.map(|_| ())
}

/// Process every presentation in `args.dir` and return the totals.
fn run(args: &Args) -> Result<BatchSummary> {
    let region = Rect::new(args.x_min, args.y_min, args.x_max, args.y_max);
    ensure!(
        region.x_min <= region.x_max && region.y_min <= region.y_max,
        "invalid region {}",
        region
    );

    let mut normalizer = TextNormalizer::new();
    for label in &args.strip_labels {
        normalizer = normalizer
            .with_label(label)
            .with_context(|| format!("Invalid strip label '{}'", label))?;
    }
    let extractor = RegionExtractor::new(args.slides.clone(), region).with_normalizer(normalizer);

    let files = discover_documents(&args.dir)?;
    log::info!(
        "found {} presentation files in '{}'",
        files.len(),
        args.dir.display()
    );
    log::info!(
        "slides {:?}, region {}",
        extractor.slide_indices(),
        extractor.region()
    );

    let output_dir = args.output.clone().unwrap_or_else(|| args.dir.clone());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let reader = FormatReader::new();
    let writer = XlsxReportWriter::new();
    let runner = BatchRunner::new(&extractor, &reader, &writer, output_dir);
    let summary = runner.run(&files);

    log::info!(
        "done: {} documents, {} reports written ({} could not be opened), {} error reports, {} unsaved",
        summary.documents,
        summary.written,
        summary.open_failures,
        summary.error_reports,
        summary.unsaved
    );

    Ok(summary)
}

fn wait_for_enter() {
    eprintln!("Press Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use slidescript_core::BatchError;
    use slidescript_pptx::fixture::{DeckBuilder, ShapeXml};
    use std::path::Path;

    fn args_for(dir: &Path) -> Args {
        Args::try_parse_from(["slidescript", "--dir", dir.to_str().unwrap()]).unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<Data>> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let range = workbook.worksheet_range("Extracted Texts").unwrap();
        range.rows().skip(1).map(|r| r.to_vec()).collect()
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["slidescript"]).unwrap();
        assert_eq!(args.dir, PathBuf::from("."));
        assert_eq!(args.output, None);
        assert_eq!(args.slides, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            (args.x_min, args.y_min, args.x_max, args.y_max),
            (0.0, 5.673, 10.1, 7.005)
        );
        assert!(args.strip_labels.is_empty());
        assert!(!args.wait);
    }

    #[test]
    fn test_slide_list_and_labels() {
        let args = Args::try_parse_from([
            "slidescript",
            "--slides",
            "-1,0,7",
            "--strip-label",
            "내레이션:",
            "--strip-label",
            "PD:",
        ])
        .unwrap();
        assert_eq!(args.slides, vec![-1, 0, 7]);
        assert_eq!(args.strip_labels, vec!["내레이션:", "PD:"]);
    }

    #[test]
    fn test_end_to_end_report() {
        let dir = tempfile::tempdir().unwrap();
        let deck = DeckBuilder::new()
            .slide(vec![
                ShapeXml::text_box("Title", &["제목"], (0.5, 0.5, 9.0, 1.0)),
                ShapeXml::text_box("Caption", &["강사: 안녕하세요 #12"], (0.0, 6.0, 2.0, 0.5)),
                ShapeXml::picture("Logo", (8.0, 6.0, 1.0, 0.5)),
            ])
            .slide(vec![ShapeXml::text_box("Caption", &["성우: 두 번째"], (1.0, 6.25, 3.0, 0.5))])
            .slide(vec![])
            .build();
        std::fs::write(dir.path().join("lesson.pptx"), deck).unwrap();

        let summary = run(&args_for(dir.path())).unwrap();
        assert_eq!(summary.documents, 1);
        assert_eq!(summary.written, 1);

        let rows = read_rows(&dir.path().join("lesson.xlsx"));
        assert_eq!(
            rows,
            vec![
                vec![Data::Float(1.0), s("안녕하세요")],
                vec![Data::Float(2.0), s("두 번째")],
                vec![Data::Float(3.0), s("텍스트 없음")],
            ]
        );
    }

    #[test]
    fn test_strip_label_applies() {
        let dir = tempfile::tempdir().unwrap();
        let deck = DeckBuilder::new()
            .slide(vec![ShapeXml::text_box("Caption", &["내레이션: 시작"], (0.0, 6.0, 2.0, 0.5))])
            .build();
        std::fs::write(dir.path().join("a.pptx"), deck).unwrap();

        let mut args = args_for(dir.path());
        args.strip_labels = vec!["내레이션:".to_string()];
        run(&args).unwrap();

        let rows = read_rows(&dir.path().join("a.xlsx"));
        assert_eq!(rows, vec![vec![Data::Float(1.0), s("시작")]]);
    }

    #[test]
    fn test_broken_file_gets_error_row() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pptx"), b"garbage").unwrap();
        let out = dir.path().join("reports");

        let mut args = args_for(dir.path());
        args.output = Some(out.clone());
        let summary = run(&args).unwrap();
        assert_eq!(summary.open_failures, 1);

        let rows = read_rows(&out.join("broken.xlsx"));
        assert_eq!(
            rows,
            vec![vec![s("오류"), s("PPT 파일을 열 수 없음 (손상 또는 형식 문제)")]]
        );
    }

    #[test]
    fn test_missing_position_writes_error_report() {
        let dir = tempfile::tempdir().unwrap();
        let deck = DeckBuilder::new()
            .slide(vec![
                ShapeXml::text_box("Caption", &["먼저"], (0.0, 6.0, 2.0, 0.5)),
            ])
            .slide(vec![ShapeXml::placeholder(
                "Floating",
                Some("body"),
                Some(42),
                &["위치 없음"],
                None,
            )])
            .build();
        std::fs::write(dir.path().join("lesson.pptx"), deck).unwrap();

        let summary = run(&args_for(dir.path())).unwrap();
        assert_eq!(summary.error_reports, 1);
        assert!(!dir.path().join("lesson.xlsx").exists());

        let rows = read_rows(&dir.path().join("lesson_ERROR.xlsx"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], s("처리 오류"));
    }

    #[test]
    fn test_no_input_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let err = run(&args_for(dir.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BatchError>(),
            Some(BatchError::NoInputFiles(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_region_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args_for(dir.path());
        args.x_min = 11.0;
        assert!(run(&args).is_err());
    }
}
