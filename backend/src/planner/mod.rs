//! Split stage: spec rows + ordered image pool → output tree + manifest.
//!
//! For every accepted row the planner creates
//!
//! ```text
//! <work>/<groupA>_<groupB>/                  level 1
//! <work>/<groupA>_<groupB>/OUT/              size table + all images
//! <work>/<groupA>_<groupB>/<item>_<color>/   level 2
//!                              ├── BIG/      originals
//!                              └── SMALL/    to be compressed and uploaded (+ swatch)
//! ```
//!
//! and copies the row's slice of the image pool into BIG, SMALL and OUT as
//! `<item>_0<n>.jpg`. Problems with one row or one file never stop the run;
//! they are logged and collected in [`PlanOutcome::warnings`].

pub mod allocation;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::ProgressSink;
use crate::config::Config;
use crate::error::{PlanError, PlanResult};
use crate::models::{Manifest, ManifestEntry, RowRejection, SpecRow};
use crate::parser::{find_spec_document, read_spec_rows, SheetRow};
use crate::scan::{list_images, SMALL_DIR};

pub use allocation::{allocate, Allocation};

/// Folder names inside the output tree.
pub const BIG_DIR: &str = "BIG";
pub const OUT_DIR: &str = "OUT";

/// Extensions tried, in order, for a swatch given without one.
const SWATCH_EXTENSIONS: [&str; 2] = [".jpg", ".png"];

// =============================================================================
// Warnings
// =============================================================================

/// What went wrong for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Row skipped.
    Rejected(RowRejection),
    /// Output directory could not be created; row skipped.
    CreateDir { path: PathBuf, message: String },
    /// Size table missing or not copyable.
    SizeTable { path: PathBuf, message: String },
    /// One image could not be copied to one target.
    ImageCopy { target: PathBuf, message: String },
    /// Swatch reference not found in the swatch directory.
    SwatchMissing { reference: String },
    /// Swatch found but not copyable.
    SwatchCopy { target: PathBuf, message: String },
    /// Pool ran out before the row got all its images.
    PoolShort { requested: usize, copied: usize },
}

/// A problem recorded while planning one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    /// 1-based row number in the spec document.
    pub row: usize,
    /// Item code, when the row got far enough to have one.
    pub item: Option<String>,
    pub kind: WarningKind,
}

impl RowWarning {
    /// Row-level failures that make the whole split "completed with errors".
    pub fn is_row_error(&self) -> bool {
        matches!(
            self.kind,
            WarningKind::Rejected(_) | WarningKind::CreateDir { .. } | WarningKind::SizeTable { .. }
        )
    }
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}", self.row)?;
        if let Some(item) = &self.item {
            write!(f, " ({})", item)?;
        }
        match &self.kind {
            WarningKind::Rejected(reason) => write!(f, ": skipped, {}", reason),
            WarningKind::CreateDir { path, message } => {
                write!(f, ": cannot create {}: {}", path.display(), message)
            }
            WarningKind::SizeTable { path, message } => {
                write!(f, ": failed to copy size table {}: {}", path.display(), message)
            }
            WarningKind::ImageCopy { target, message } => {
                write!(f, ": failed to copy image to {}: {}", target.display(), message)
            }
            WarningKind::SwatchMissing { reference } => {
                write!(f, ": color pic not found: {}", reference)
            }
            WarningKind::SwatchCopy { target, message } => {
                write!(f, ": failed to copy color pic to {}: {}", target.display(), message)
            }
            WarningKind::PoolShort { requested, copied } => {
                write!(f, ": only {} of {} images available", copied, requested)
            }
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Everything the split stage produced, including partial results.
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    /// SMALL directory of every planned row, in row order.
    pub small_dirs: Vec<PathBuf>,
    pub manifest: Manifest,
    /// Every problem, in encounter order.
    pub warnings: Vec<RowWarning>,
}

impl PlanOutcome {
    /// Row-level failures only.
    pub fn row_errors(&self) -> impl Iterator<Item = &RowWarning> {
        self.warnings.iter().filter(|w| w.is_row_error())
    }

    /// `PlanError::RowsFailed` when any row-level failure occurred.
    pub fn aggregate_error(&self) -> Option<PlanError> {
        let errors: Vec<String> = self.row_errors().map(|w| w.to_string()).collect();
        (!errors.is_empty()).then_some(PlanError::RowsFailed(errors))
    }
}

/// Accumulator threaded through the row loop.
#[derive(Debug, Default)]
struct PlanState {
    /// Pool index where the next accepted row starts.
    offset: usize,
    outcome: PlanOutcome,
}

impl PlanState {
    fn warn<L: ProgressSink>(&mut self, sink: &L, warning: RowWarning) {
        sink.warning(warning.to_string());
        self.outcome.warnings.push(warning);
    }
}

// =============================================================================
// Output Tree
// =============================================================================

/// The five directories of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTree {
    pub level1: PathBuf,
    pub level2: PathBuf,
    pub big: PathBuf,
    pub small: PathBuf,
    pub out: PathBuf,
}

impl OutputTree {
    pub fn for_row(work_root: &Path, row: &SpecRow) -> Self {
        let level1 = work_root.join(format!("{}_{}", row.group_a, row.group_b));
        let level2 = level1.join(format!("{}_{}", row.item_code, row.color_code));
        Self {
            big: level2.join(BIG_DIR),
            small: level2.join(SMALL_DIR),
            out: level1.join(OUT_DIR),
            level1,
            level2,
        }
    }

    /// Create all five directories; existing ones are fine.
    pub fn create(&self) -> Result<(), (PathBuf, std::io::Error)> {
        for dir in [&self.level1, &self.level2, &self.big, &self.small, &self.out] {
            fs::create_dir_all(dir).map_err(|e| (dir.clone(), e))?;
        }
        Ok(())
    }
}

// =============================================================================
// Planner
// =============================================================================

/// Filesystem locations the planner reads from and writes to.
#[derive(Debug, Clone)]
pub struct Planner {
    /// Output tree root.
    pub work_root: PathBuf,
    /// Source of the image pool.
    pub picture_dir: PathBuf,
    /// Size tables named `<style prefix>.jpg`.
    pub size_table_dir: PathBuf,
    /// Swatch images.
    pub swatch_dir: PathBuf,
}

impl Planner {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_root: config.work_path.clone(),
            picture_dir: config.picture_dir(),
            size_table_dir: config.size_table_path.clone(),
            swatch_dir: config.color_pic_path.clone(),
        }
    }

    /// Plan every row against `pool` (file names inside `picture_dir`).
    pub fn plan<L: ProgressSink>(&self, rows: &[SheetRow], pool: &[String], sink: &L) -> PlanOutcome {
        let state = rows
            .iter()
            .fold(PlanState::default(), |state, raw| self.plan_row(state, raw, pool, sink));
        state.outcome
    }

    fn plan_row<L: ProgressSink>(
        &self,
        mut state: PlanState,
        raw: &SheetRow,
        pool: &[String],
        sink: &L,
    ) -> PlanState {
        let row = match SpecRow::from_cells(&raw.cells) {
            Ok(row) => row,
            Err(reason) => {
                state.warn(sink, RowWarning {
                    row: raw.number,
                    item: None,
                    kind: WarningKind::Rejected(reason),
                });
                return state;
            }
        };

        let alloc = Allocation::at(state.offset, row.step_count);
        state.offset = alloc.next_offset();

        let warn = |state: &mut PlanState, kind: WarningKind| {
            state.warn(sink, RowWarning {
                row: raw.number,
                item: Some(row.item_code.clone()),
                kind,
            })
        };

        let tree = OutputTree::for_row(&self.work_root, &row);
        if let Err((path, e)) = tree.create() {
            warn(&mut state, WarningKind::CreateDir { path, message: e.to_string() });
            return state;
        }

        // Size table
        let style = row.style_prefix();
        let size_src = self.size_table_dir.join(format!("{}.jpg", style));
        let size_dst = tree.out.join(format!("{}_{}.jpg", row.item_code, style));
        if let Err(e) = fs::copy(&size_src, &size_dst) {
            warn(&mut state, WarningKind::SizeTable { path: size_src, message: e.to_string() });
        }

        let range = alloc.clamped(pool.len());
        let copied = range.len();

        // Swatch, once per row that receives images
        let swatch_filename = match &row.swatch_ref {
            Some(reference) if copied > 0 => match self.copy_swatch(&row, reference, &tree) {
                Ok(name) => name,
                Err(kind) => {
                    warn(&mut state, kind);
                    String::new()
                }
            },
            _ => String::new(),
        };

        // Images
        for (i, pool_index) in range.enumerate() {
            let count = i + 1;
            let filename = row.image_filename(count);
            let src = self.picture_dir.join(&pool[pool_index]);

            for dir in [&tree.big, &tree.small, &tree.out] {
                let target = dir.join(&filename);
                if let Err(e) = fs::copy(&src, &target) {
                    warn(&mut state, WarningKind::ImageCopy { target, message: e.to_string() });
                }
            }

            state.outcome.manifest.insert(
                filename,
                ManifestEntry {
                    item_code: row.item_code.clone(),
                    remote_path: String::new(),
                    sort: count,
                    default_flag: row.default_flag(count),
                    swatch_filename: swatch_filename.clone(),
                },
            );
        }

        if copied < alloc.requested() {
            warn(&mut state, WarningKind::PoolShort { requested: alloc.requested(), copied });
        }

        state.outcome.small_dirs.push(tree.small);
        sink.info(format!("Processed {} ({} images)", row.item_code, copied));
        state
    }

    /// Find the swatch and copy it into SMALL as `<item>_Color<ext>`.
    fn copy_swatch(&self, row: &SpecRow, reference: &str, tree: &OutputTree) -> Result<String, WarningKind> {
        let (src, ext) = resolve_swatch(&self.swatch_dir, reference).ok_or_else(|| {
            WarningKind::SwatchMissing { reference: reference.to_string() }
        })?;

        let name = format!("{}_Color{}", row.item_code, ext);
        let target = tree.small.join(&name);
        fs::copy(&src, &target)
            .map(|_| name)
            .map_err(|e| WarningKind::SwatchCopy { target, message: e.to_string() })
    }
}

/// Locate a swatch: verbatim when the reference has an extension, otherwise
/// try `.jpg` then `.png`. Returns the path and the extension (with dot).
pub fn resolve_swatch(dir: &Path, reference: &str) -> Option<(PathBuf, String)> {
    if let Some(ext) = Path::new(reference).extension().and_then(|e| e.to_str()) {
        let path = dir.join(reference);
        return path.is_file().then(|| (path, format!(".{}", ext)));
    }

    SWATCH_EXTENSIONS.iter().find_map(|ext| {
        let path = dir.join(format!("{}{}", reference, ext));
        path.is_file().then(|| (path, ext.to_string()))
    })
}

/// Split stage entry point: locate inputs, plan, persist the manifest.
///
/// Fatal only when inputs cannot be read or the manifest cannot be saved.
/// Row problems are in the outcome; see [`PlanOutcome::aggregate_error`].
pub fn run_split<L: ProgressSink>(config: &Config, sink: &L) -> PlanResult<PlanOutcome> {
    sink.info("Starting split...");
    let root = config.work_root()?;

    let document = find_spec_document(root)?;
    sink.info(format!("Found spec document: {}", document.display()));

    let picture_dir = config.picture_dir();
    let pool = list_images(&picture_dir).map_err(|source| PlanError::PictureDir {
        path: picture_dir.clone(),
        source,
    })?;
    sink.info(format!("Found {} images", pool.len()));

    let rows = read_spec_rows(&document)?;
    sink.info(format!("Read {} rows", rows.len()));

    let outcome = Planner::from_config(config).plan(&rows, &pool, sink);

    let manifest_path = config.manifest_path();
    outcome.manifest.save(&manifest_path)?;
    sink.info(format!(
        "Saved manifest with {} entries: {}",
        outcome.manifest.len(),
        manifest_path.display()
    ));

    let errors = outcome.row_errors().count();
    if errors > 0 {
        sink.warning(format!("Split completed with {} row error(s)", errors));
    } else {
        sink.success("Split complete");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::logs::MemorySink;
    use crate::models::DefaultFlag;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        config: Config,
    }

    /// Work root with `org/` holding `n` images, size tables and swatches dirs.
    fn fixture(images: usize) -> Fixture {
        let dir = tempdir().unwrap();
        let work = dir.path().join("work");
        let org = work.join("org");
        let sizes = dir.path().join("sizes");
        let colors = dir.path().join("colors");
        for d in [&org, &sizes, &colors] {
            fs::create_dir_all(d).unwrap();
        }
        for i in 1..=images {
            fs::write(org.join(format!("shot ({}).jpg", i)), format!("image {}", i)).unwrap();
        }

        let mut config = Config::default();
        config.work_path = work;
        config.size_table_path = sizes;
        config.color_pic_path = colors;
        Fixture { _dir: dir, config }
    }

    fn sheet(rows: &[&[&str]]) -> Vec<SheetRow> {
        rows.iter()
            .enumerate()
            .map(|(i, cells)| SheetRow {
                number: i + 1,
                cells: cells.iter().map(|s| s.to_string()).collect(),
            })
            .collect()
    }

    fn pool(config: &Config) -> Vec<String> {
        list_images(&config.picture_dir()).unwrap()
    }

    #[test]
    fn test_single_row_scenario() {
        let fx = fixture(5);
        fs::write(fx.config.size_table_path.join("STYLE1.jpg"), b"size").unwrap();
        let rows = sheet(&[&["G1", "G2", "STYLE1-A", "ITEM1", "", "", "RED", "", "5"]]);

        let sink = MemorySink::new();
        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &sink);

        let work = &fx.config.work_path;
        let level2 = work.join("G1_G2/ITEM1_RED");
        for n in 1..=5 {
            let name = format!("ITEM1_0{}.jpg", n);
            for dir in [level2.join("BIG"), level2.join("SMALL"), work.join("G1_G2/OUT")] {
                assert!(dir.join(&name).is_file(), "{} missing in {}", name, dir.display());
            }
            assert_eq!(outcome.manifest.get(&name).unwrap().sort, n);
        }
        assert_eq!(
            fs::read_to_string(level2.join("BIG/ITEM1_03.jpg")).unwrap(),
            "image 3"
        );
        assert!(work.join("G1_G2/OUT/ITEM1_STYLE1.jpg").is_file());
        assert_eq!(outcome.manifest.len(), 5);
        assert_eq!(outcome.small_dirs, vec![level2.join("SMALL")]);
        assert!(outcome.warnings.is_empty());
        assert!(outcome.aggregate_error().is_none());
    }

    #[test]
    fn test_rows_take_consecutive_slices() {
        let fx = fixture(6);
        let rows = sheet(&[
            &["G", "H", "S1", "A", "", "", "RED", "", "2"],
            &["G", "H", "S2", "B", "", "", "BLUE", "", "3", "2", "3"],
            &["G", "H", "S3", "C", "", "", "GRN", "", "1"],
        ]);

        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &MemorySink::new());

        let small_b = fx.config.work_path.join("G_H/B_BLUE/SMALL");
        assert_eq!(fs::read_to_string(small_b.join("B_01.jpg")).unwrap(), "image 3");
        assert_eq!(fs::read_to_string(small_b.join("B_03.jpg")).unwrap(), "image 5");
        let small_c = fx.config.work_path.join("G_H/C_GRN/SMALL");
        assert_eq!(fs::read_to_string(small_c.join("C_01.jpg")).unwrap(), "image 6");

        assert_eq!(outcome.manifest.get("B_01.jpg").unwrap().default_flag, DefaultFlag::None);
        assert_eq!(outcome.manifest.get("B_02.jpg").unwrap().default_flag, DefaultFlag::Primary);
        assert_eq!(outcome.manifest.get("B_03.jpg").unwrap().default_flag, DefaultFlag::Secondary);
        assert_eq!(outcome.small_dirs.len(), 3);
    }

    #[test]
    fn test_bad_rows_skipped_and_reported() {
        let fx = fixture(4);
        let rows = sheet(&[
            &["Group", "Sub", "Style", "Item", "", "", "Color", "", "Count"],
            &["G", "H", "S1", "A", "", "", "RED", "", "2"],
            &["too", "short"],
            &["G", "H", "S2", "B", "", "", "BLUE", "", "2"],
        ]);

        let sink = MemorySink::new();
        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &sink);

        // Rejected rows consume no images
        let small_b = fx.config.work_path.join("G_H/B_BLUE/SMALL");
        assert_eq!(fs::read_to_string(small_b.join("B_01.jpg")).unwrap(), "image 3");

        let rejected: Vec<usize> = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::Rejected(_)))
            .map(|w| w.row)
            .collect();
        assert_eq!(rejected, vec![1, 3]);

        // Size tables are missing for both planned rows
        match outcome.aggregate_error() {
            Some(PlanError::RowsFailed(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected RowsFailed, got {:?}", other),
        }
        assert!(sink.contains("invalid step count"));
    }

    #[test]
    fn test_short_pool_is_clamped() {
        let fx = fixture(3);
        let rows = sheet(&[
            &["G", "H", "S", "A", "", "", "RED", "", "2"],
            &["G", "H", "S", "B", "", "", "RED", "", "4"],
            &["G", "H", "S", "C", "", "", "RED", "", "1"],
        ]);

        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &MemorySink::new());

        assert!(outcome.manifest.get("B_01.jpg").is_some());
        assert!(outcome.manifest.get("B_02.jpg").is_none());
        assert!(outcome.manifest.get("C_01.jpg").is_none());
        assert_eq!(outcome.small_dirs.len(), 3);

        let short: Vec<_> = outcome
            .warnings
            .iter()
            .filter_map(|w| match w.kind {
                WarningKind::PoolShort { requested, copied } => Some((w.row, requested, copied)),
                _ => None,
            })
            .collect();
        assert_eq!(short, vec![(2, 4, 1), (3, 1, 0)]);
        assert!(outcome.warnings.iter().filter(|w| w.is_row_error()).all(|w| matches!(w.kind, WarningKind::SizeTable { .. })));
    }

    #[test]
    fn test_row_without_images_gets_no_swatch() {
        let fx = fixture(1);
        fs::write(fx.config.color_pic_path.join("RED.jpg"), b"swatch").unwrap();
        let rows = sheet(&[
            &["G", "H", "S", "A", "", "", "RED", "", "1", "", "", "RED"],
            &["G", "H", "S", "B", "", "", "RED", "", "1", "", "", "RED"],
        ]);

        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &MemorySink::new());

        let work = &fx.config.work_path;
        assert!(work.join("G_H/A_RED/SMALL/A_Color.jpg").is_file());
        assert!(!work.join("G_H/B_RED/SMALL/B_Color.jpg").exists());
        assert!(work.join("G_H/B_RED/SMALL").is_dir());
        assert_eq!(outcome.manifest.get("A_01.jpg").unwrap().swatch_filename, "A_Color.jpg");
    }

    #[test]
    fn test_failed_copy_target_does_not_block_others() {
        let fx = fixture(1);
        let work = fx.config.work_path.clone();
        // A directory squatting on the BIG target makes that copy fail
        fs::create_dir_all(work.join("G_H/A_RED/BIG/A_01.jpg")).unwrap();
        let rows = sheet(&[&["G", "H", "S", "A", "", "", "RED", "", "1"]]);

        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &MemorySink::new());

        assert!(work.join("G_H/A_RED/SMALL/A_01.jpg").is_file());
        assert!(work.join("G_H/OUT/A_01.jpg").is_file());
        let failed: Vec<&PathBuf> = outcome
            .warnings
            .iter()
            .filter_map(|w| match &w.kind {
                WarningKind::ImageCopy { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec![&work.join("G_H/A_RED/BIG/A_01.jpg")]);
        assert!(outcome.manifest.get("A_01.jpg").is_some());
    }

    #[test]
    fn test_huge_step_count_does_not_overflow() {
        let fx = fixture(3);
        let huge = usize::MAX.to_string();
        let rows = sheet(&[
            &["G", "H", "S", "A", "", "", "RED", "", huge.as_str()],
            &["G", "H", "S", "B", "", "", "RED", "", "2"],
        ]);

        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &MemorySink::new());

        assert!(outcome.manifest.get("A_03.jpg").is_some());
        assert!(outcome.manifest.get("B_01.jpg").is_none());
        assert_eq!(outcome.small_dirs.len(), 2);
        let short_rows: Vec<usize> = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::PoolShort { .. }))
            .map(|w| w.row)
            .collect();
        assert_eq!(short_rows, vec![1, 2]);
    }

    #[test]
    fn test_swatch_resolution() {
        let fx = fixture(2);
        let colors = &fx.config.color_pic_path;
        fs::write(colors.join("red.png"), b"png chip").unwrap();
        fs::write(colors.join("blue.jpg"), b"jpg chip").unwrap();
        fs::write(colors.join("blue.png"), b"png chip").unwrap();
        fs::write(colors.join("green.gif"), b"gif chip").unwrap();

        assert_eq!(resolve_swatch(colors, "red").map(|(_, e)| e), Some(".png".into()));
        assert_eq!(resolve_swatch(colors, "blue").map(|(_, e)| e), Some(".jpg".into()));
        assert_eq!(resolve_swatch(colors, "green.gif").map(|(_, e)| e), Some(".gif".into()));
        assert!(resolve_swatch(colors, "green").is_none());
        assert!(resolve_swatch(colors, "red.jpg").is_none());
    }

    #[test]
    fn test_swatch_copied_and_recorded() {
        let fx = fixture(2);
        fs::write(fx.config.color_pic_path.join("chip.png"), b"chip").unwrap();
        let rows = sheet(&[
            &["G", "H", "S", "A", "", "", "RED", "", "1", "", "", "chip"],
            &["G", "H", "S", "B", "", "", "RED", "", "1", "", "", "nothing"],
        ]);

        let sink = MemorySink::new();
        let outcome = Planner::from_config(&fx.config).plan(&rows, &pool(&fx.config), &sink);

        let small_a = fx.config.work_path.join("G_H/A_RED/SMALL");
        assert!(small_a.join("A_Color.png").is_file());
        assert_eq!(outcome.manifest.get("A_01.jpg").unwrap().swatch_filename, "A_Color.png");
        assert_eq!(outcome.manifest.get("B_01.jpg").unwrap().swatch_filename, "");

        let missing = outcome
            .warnings
            .iter()
            .find(|w| matches!(w.kind, WarningKind::SwatchMissing { .. }))
            .unwrap();
        assert_eq!(missing.item.as_deref(), Some("B"));
        assert!(!missing.is_row_error());
        assert!(sink.contains("color pic not found: nothing"));
    }

    #[test]
    fn test_run_split_twice_is_idempotent() {
        let fx = fixture(3);
        fs::write(
            fx.config.work_path.join("spec.csv"),
            "G1,G2,STYLE1-A,ITEM1,,,RED/,,3,1\n",
        )
        .unwrap();
        fs::write(fx.config.size_table_path.join("STYLE1.jpg"), b"size").unwrap();

        let sink = MemorySink::new();
        let first = run_split(&fx.config, &sink).unwrap();
        let second = run_split(&fx.config, &sink).unwrap();

        assert_eq!(first.manifest, second.manifest);
        assert_eq!(second.manifest.len(), 3);
        assert!(second.aggregate_error().is_none());

        let saved = Manifest::load(&fx.config.manifest_path()).unwrap();
        assert_eq!(saved, second.manifest);
        assert_eq!(saved.get("ITEM1_01.jpg").unwrap().default_flag, DefaultFlag::Primary);
    }

    #[test]
    fn test_run_split_without_document_fails() {
        let fx = fixture(1);
        let err = run_split(&fx.config, &MemorySink::new()).unwrap_err();
        assert!(matches!(err, PlanError::Sheet(_)));
    }

    #[test]
    fn test_run_split_without_picture_dir_fails() {
        let fx = fixture(0);
        fs::write(fx.config.work_path.join("spec.csv"), "a,b,c,d,,,e,,1\n").unwrap();
        fs::remove_dir(fx.config.picture_dir()).unwrap();

        let err = run_split(&fx.config, &MemorySink::new()).unwrap_err();
        assert!(matches!(err, PlanError::PictureDir { .. }));
    }
}
