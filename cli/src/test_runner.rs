use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use concretizer::ExpressionEvaluator;

use crate::config::RenderConfig;

const TEMPLATE_EXTENSION: &str = "xcb";

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub outcome: TestOutcome,
}

/// The files that make up one golden test: `page.xcb` renders to `page`,
/// with optional render settings in `page.toml` and a diff in `page.err`.
struct GoldenFiles {
    template: PathBuf,
    expected: PathBuf,
    config: PathBuf,
    diff: PathBuf,
}

impl GoldenFiles {
    fn new(template: &Path) -> Self {
        let base = template.with_extension("");
        GoldenFiles {
            template: template.to_path_buf(),
            config: template.with_extension("toml"),
            diff: template.with_extension("err"),
            expected: base,
        }
    }
}

/// The `.err` file contents for a mismatch.
fn format_mismatch(expected: &str, actual: &str) -> String {
    format!(
        "==== Expected ====\n{}==================\n==== Actual ======\n{}==================\n",
        expected, actual
    )
}

/// Render a template the way `xcb run` prints it: the output plus a newline.
fn render_file(files: &GoldenFiles) -> Result<String, String> {
    let source = std::fs::read_to_string(&files.template)
        .map_err(|e| format!("cannot read template: {}", e))?;
    let config = if files.config.is_file() {
        RenderConfig::load(&files.config)?
    } else {
        RenderConfig::default()
    };

    let template = xcb::parser::Parser::new(source, 0).parse();
    let mut evaluator = ExpressionEvaluator::new();
    let rendered = concretizer::render_template_with(
        &template,
        &mut evaluator,
        config.environment(),
        config.options(),
    )
    .map_err(|e| format!("render error: {}", e))?;

    Ok(format!("{}\n", rendered.output))
}

pub(crate) fn run_single_test(path: &Path) -> TestResult {
    let files = GoldenFiles::new(path);
    let fail = |reason: String| TestResult {
        path: path.to_path_buf(),
        outcome: TestOutcome::Fail(reason),
    };

    let expected = match std::fs::read_to_string(&files.expected) {
        Ok(text) => text,
        Err(e) => {
            return fail(format!(
                "cannot read expected output '{}': {}",
                files.expected.display(),
                e
            ));
        }
    };

    let actual = match render_file(&files) {
        Ok(actual) => actual,
        Err(reason) => return fail(reason),
    };

    if actual == expected {
        if files.diff.is_file() {
            let _ = std::fs::remove_file(&files.diff);
        }
        return TestResult {
            path: path.to_path_buf(),
            outcome: TestOutcome::Pass,
        };
    }

    match std::fs::write(&files.diff, format_mismatch(&expected, &actual)) {
        Ok(()) => fail(format!(
            "output mismatch, see {}",
            files.diff.display()
        )),
        Err(e) => fail(format!(
            "output mismatch (cannot write {}: {})\n  expected: {:?}\n  actual:   {:?}",
            files.diff.display(),
            e,
            expected,
            actual
        )),
    }
}

/// Discover `.xcb` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION) {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .xcb files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Select the requested categories; a category also selects its subfolders.
fn filter_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut filtered = BTreeMap::new();
    for request in requested {
        let request = request.trim_matches('/');
        let prefix = format!("{}/", request);
        let before = filtered.len();
        for (category, files) in all {
            if category == request || category.starts_with(&prefix) {
                filtered.insert(category.as_str(), files);
            }
        }
        if filtered.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                request,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

fn test_label(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
}

/// Run every `.xcb` file under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all_categories.is_empty() {
        eprintln!("no .xcb files found in {}", path.display());
        return 1;
    }

    let run_categories = filter_categories(&all_categories, categories);
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &run_categories {
        eprintln!();
        eprintln!("{}", palette.bold(category_label(category)));

        for file in *files {
            let result = run_single_test(file);
            match result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), test_label(file));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), test_label(file));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn matching_output_passes_and_clears_stale_diff() {
        let dir = tempfile::tempdir().unwrap();
        let template = write(dir.path(), "sum.xcb", "#{x = 2 + 3}#\n#x");
        write(dir.path(), "sum", "5\n");
        let stale = write(dir.path(), "sum.err", "old");

        assert!(matches!(run_single_test(&template).outcome, TestOutcome::Pass));
        assert!(!stale.exists());
    }

    #[test]
    fn mismatch_writes_diff_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = write(dir.path(), "greet.txt.xcb", "Hello #name");
        write(dir.path(), "greet.txt", "Hello Amy\n");
        write(dir.path(), "greet.txt.toml", "[vars]\nname = \"Bob\"\n");

        assert!(matches!(run_single_test(&template).outcome, TestOutcome::Fail(_)));
        let diff = std::fs::read_to_string(dir.path().join("greet.txt.err")).unwrap();
        assert_eq!(
            diff,
            "==== Expected ====\nHello Amy\n==================\n==== Actual ======\nHello Bob\n==================\n"
        );
    }

    #[test]
    fn render_errors_and_missing_golden_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let broken = write(dir.path(), "broken.xcb", "#missing");
        write(dir.path(), "broken", "\n");
        let orphan = write(dir.path(), "orphan.xcb", "text");

        assert!(matches!(
            run_single_test(&broken).outcome,
            TestOutcome::Fail(reason) if reason.starts_with("render error")
        ));
        assert!(matches!(run_single_test(&orphan).outcome, TestOutcome::Fail(_)));
    }

    #[test]
    fn strict_config_turns_warnings_into_failures() {
        let dir = tempfile::tempdir().unwrap();
        let template = write(dir.path(), "strict.xcb", "#(nope)ok");
        write(dir.path(), "strict", "ok\n");
        assert!(matches!(run_single_test(&template).outcome, TestOutcome::Pass));

        write(dir.path(), "strict.toml", "strict = true\n");
        assert!(matches!(run_single_test(&template).outcome, TestOutcome::Fail(_)));
    }

    #[test]
    fn tests_are_grouped_by_subfolder() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "top.xcb", "");
        write(dir.path(), "loops/range.xcb", "");
        write(dir.path(), "loops/nested/deep.xcb", "");
        write(dir.path(), "loops/range", "");

        let categories = discover_categorized(dir.path());
        let names: Vec<&str> = categories.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["", "loops", "loops/nested"]);

        let selected = filter_categories(&categories, &["loops".to_string()]);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn run_tests_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok.xcb", "fine");
        write(dir.path(), "ok", "fine\n");
        assert_eq!(run_tests(dir.path(), true, &[]), 0);

        write(dir.path(), "bad.xcb", "fine");
        write(dir.path(), "bad", "different\n");
        assert_eq!(run_tests(dir.path(), true, &[]), 1);
    }
}
