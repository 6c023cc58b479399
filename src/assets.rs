//! Asset pipeline: hashed copies, passthrough copies and image variants.
//!
//! Every file under the assets root produces exactly one entry in the
//! [`AssetMap`], keyed by its POSIX-style path relative to the root:
//!
//! | Kind | Rule | Output |
//! |---|---|---|
//! | Passthrough | `.html`, `.txt`, `.xml` | copied verbatim to the same path |
//! | Image | `.jpg`/`.jpeg`/`.png` under `images.prefix` | one AVIF per variant |
//! | Hashed | anything else | copied to `<base>.<hash><ext>` |
//!
//! ```json
//! {
//!   "css/style.css": "css/style.1a2b3c4d.css",
//!   "img/cover.jpg": { "sm": "img/cover.sm.0f0f0f0f.avif", "md": "img/cover.md.a1a1a1a1.avif" },
//!   "robots-extra.txt": "robots-extra.txt"
//! }
//! ```
//!
//! ## Stages
//!
//! 1. [`enumerate_assets`]: walk the tree (sorted, no output touched).
//! 2. [`plan_assets`]: hash or encode every file in parallel on the rayon
//!    pool, keeping results in memory.
//! 3. [`materialize`]: create directories and write files.
//!
//! Planning completes for every file before anything is written, so a single
//! undecodable image aborts the build with an untouched output directory.
//! Output paths depend only on the relative path, the bytes and the variant
//! config, so two runs over the same tree produce the same map and files.

use crate::cache::{CacheStats, CacheStatus, HashCache, content_hash, hashed_name};
use crate::config::{ConfigError, ImagesConfig, VariantSpec};
use crate::imaging::{BackendError, ImageBackend, Tint, derive_variants, variant_file_name};
use crate::site::Warning;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk assets: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Image {rel} could not be processed: {source}")]
    Image { rel: String, source: BackendError },
}

/// Final output of one asset: a single path, or one path per variant label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetOutput {
    Single(String),
    Variants(BTreeMap<String, String>),
}

impl AssetOutput {
    /// Output path of a non-image asset.
    pub fn single(&self) -> Option<&str> {
        match self {
            AssetOutput::Single(p) => Some(p),
            AssetOutput::Variants(_) => None,
        }
    }

    /// Output path of one image variant.
    pub fn variant(&self, label: &str) -> Option<&str> {
        match self {
            AssetOutput::Variants(v) => v.get(label).map(String::as_str),
            AssetOutput::Single(_) => None,
        }
    }
}

/// `relative source path → output`, ordered by key.
pub type AssetMap = BTreeMap<String, AssetOutput>;

/// `relative source path → derived variants` for images, with the sizes
/// actually produced.
pub type VariantIndex = BTreeMap<String, Vec<VariantInfo>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Passthrough,
    Image,
    Hashed,
}

/// A file found under the assets root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// POSIX-style path relative to the assets root.
    pub rel: String,
    pub path: PathBuf,
}

/// One pending filesystem write, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetWrite {
    Copy { from: PathBuf, to: String },
    Bytes { to: String, bytes: Vec<u8> },
}

impl AssetWrite {
    pub fn target(&self) -> &str {
        match self {
            AssetWrite::Copy { to, .. } | AssetWrite::Bytes { to, .. } => to,
        }
    }
}

/// Size of one derived variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub label: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Result of planning a single asset.
#[derive(Debug, Clone)]
pub struct PlannedAsset {
    pub rel: String,
    pub kind: AssetKind,
    pub output: AssetOutput,
    /// Content hash for hashed assets.
    pub hash: Option<String>,
    pub variants: Vec<VariantInfo>,
    pub writes: Vec<AssetWrite>,
}

/// Progress events, sent after the asset has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    Copied {
        rel: String,
    },
    Hashed {
        rel: String,
        output: String,
        status: CacheStatus,
    },
    Image {
        rel: String,
        variants: Vec<VariantInfo>,
    },
}

/// Everything the rest of the build needs from the asset stage.
#[derive(Debug, Default)]
pub struct AssetOutcome {
    pub map: AssetMap,
    pub variants: VariantIndex,
    pub stats: CacheStats,
    pub warnings: Vec<Warning>,
}

/// Variant settings resolved once per run.
#[derive(Debug, Clone)]
pub struct ImagePlan<'a> {
    pub prefix: &'a str,
    pub variants: &'a [VariantSpec],
    pub tint: Option<Tint>,
}

impl<'a> ImagePlan<'a> {
    pub fn from_config(images: &'a ImagesConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            prefix: &images.prefix,
            variants: &images.variants,
            tint: images.parsed_tint()?,
        })
    }
}

// =============================================================================
// Enumeration and classification
// =============================================================================

/// Walk every file under `root`, sorted by file name at each level.
pub fn enumerate_assets(root: &Path) -> impl Iterator<Item = Result<AssetFile, walkdir::Error>> {
    let root_buf = root.to_path_buf();
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter(|entry| !matches!(entry, Ok(e) if e.file_type().is_dir()))
        .map(move |entry| {
            let entry = entry?;
            let rel = relative_posix(&root_buf, entry.path());
            Ok(AssetFile {
                rel,
                path: entry.into_path(),
            })
        })
}

fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn extension_lower(rel: &str) -> Option<String> {
    let file = rel.rsplit('/').next().unwrap_or(rel);
    match file.rfind('.') {
        Some(dot) if dot > 0 => Some(file[dot + 1..].to_ascii_lowercase()),
        _ => None,
    }
}

/// Decide how a file is handled from its relative path alone.
pub fn classify(rel: &str, image_prefix: &str) -> AssetKind {
    match extension_lower(rel).as_deref() {
        Some("html" | "txt" | "xml") => AssetKind::Passthrough,
        Some("jpg" | "jpeg" | "png") if rel.starts_with(image_prefix) => AssetKind::Image,
        _ => AssetKind::Hashed,
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Plan every file in parallel. Fails on the first error; no output is written.
pub fn plan_assets(
    files: &[AssetFile],
    plan: &ImagePlan,
    backend: &impl ImageBackend,
) -> Result<Vec<PlannedAsset>, AssetError> {
    files
        .par_iter()
        .map(|file| plan_asset(file, plan, backend))
        .collect()
}

fn plan_asset(
    file: &AssetFile,
    plan: &ImagePlan,
    backend: &impl ImageBackend,
) -> Result<PlannedAsset, AssetError> {
    let kind = classify(&file.rel, plan.prefix);
    match kind {
        AssetKind::Passthrough => Ok(PlannedAsset {
            rel: file.rel.clone(),
            kind,
            output: AssetOutput::Single(file.rel.clone()),
            hash: None,
            variants: Vec::new(),
            writes: vec![AssetWrite::Copy {
                from: file.path.clone(),
                to: file.rel.clone(),
            }],
        }),
        AssetKind::Hashed => {
            let bytes = fs::read(&file.path)?;
            let hash = content_hash(&bytes);
            let out = hashed_name(&file.rel, &hash);
            Ok(PlannedAsset {
                rel: file.rel.clone(),
                kind,
                output: AssetOutput::Single(out.clone()),
                hash: Some(hash),
                variants: Vec::new(),
                writes: vec![AssetWrite::Bytes { to: out, bytes }],
            })
        }
        AssetKind::Image => plan_image(file, plan, backend),
    }
}

fn plan_image(
    file: &AssetFile,
    plan: &ImagePlan,
    backend: &impl ImageBackend,
) -> Result<PlannedAsset, AssetError> {
    let source = fs::read(&file.path)?;
    let derived =
        derive_variants(backend, &source, plan.variants, plan.tint).map_err(|source| {
            AssetError::Image {
                rel: file.rel.clone(),
                source,
            }
        })?;

    let (dir, base) = split_stem(&file.rel);
    let mut outputs = BTreeMap::new();
    let mut variants = Vec::new();
    let mut writes = Vec::new();
    for v in derived {
        let name = variant_file_name(base, &v.label, &v.hash);
        let path = match dir {
            Some(dir) => format!("{}/{}", dir, name),
            None => name,
        };
        outputs.insert(v.label.clone(), path.clone());
        variants.push(VariantInfo {
            label: v.label,
            path: path.clone(),
            width: v.width,
            height: v.height,
        });
        writes.push(AssetWrite::Bytes {
            to: path,
            bytes: v.bytes,
        });
    }

    Ok(PlannedAsset {
        rel: file.rel.clone(),
        kind: AssetKind::Image,
        output: AssetOutput::Variants(outputs),
        hash: None,
        variants,
        writes,
    })
}

/// `img/a/cover.jpg` → (`Some("img/a")`, `"cover"`).
fn split_stem(rel: &str) -> (Option<&str>, &str) {
    let (dir, file) = match rel.rsplit_once('/') {
        Some((d, f)) => (Some(d), f),
        None => (None, rel),
    };
    let base = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    (dir, base)
}

// =============================================================================
// Materialization
// =============================================================================

/// Perform planned writes under `dist`, creating directories as needed.
pub fn materialize(dist: &Path, writes: &[AssetWrite]) -> Result<(), AssetError> {
    for write in writes {
        let target = dist.join(write.target());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match write {
            AssetWrite::Copy { from, .. } => {
                fs::copy(from, &target)?;
            }
            AssetWrite::Bytes { bytes, .. } => fs::write(&target, bytes)?,
        }
    }
    Ok(())
}

/// Run the whole asset stage.
///
/// The cache is updated in place; persisting it is the caller's job.
pub fn process_assets(
    root: &Path,
    dist: &Path,
    images: &ImagesConfig,
    cache: &mut HashCache,
    backend: &impl ImageBackend,
    events: Option<Sender<AssetEvent>>,
) -> Result<AssetOutcome, AssetError> {
    if !root.is_dir() {
        return Ok(AssetOutcome {
            warnings: vec![Warning::MissingAssetsDir(root.to_path_buf())],
            ..AssetOutcome::default()
        });
    }

    let plan = ImagePlan::from_config(images)?;
    let files = enumerate_assets(root).collect::<Result<Vec<_>, _>>()?;
    let planned = plan_assets(&files, &plan, backend)?;

    let mut outcome = AssetOutcome::default();
    for asset in planned {
        materialize(dist, &asset.writes)?;

        let event = match asset.kind {
            AssetKind::Passthrough => {
                outcome.stats.copied += 1;
                AssetEvent::Copied {
                    rel: asset.rel.clone(),
                }
            }
            AssetKind::Image => {
                outcome.stats.images += 1;
                outcome
                    .variants
                    .insert(asset.rel.clone(), asset.variants.clone());
                AssetEvent::Image {
                    rel: asset.rel.clone(),
                    variants: asset.variants,
                }
            }
            AssetKind::Hashed => {
                let hash = asset.hash.as_deref().unwrap_or_default();
                let status = cache.observe(&asset.rel, hash);
                outcome.stats.record(status);
                AssetEvent::Hashed {
                    rel: asset.rel.clone(),
                    output: asset.output.single().unwrap_or_default().to_string(),
                    status,
                }
            }
        };
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
        outcome.map.insert(asset.rel, asset.output);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{list_files, png_bytes, write_file};
    use tempfile::TempDir;

    fn images() -> ImagesConfig {
        ImagesConfig::default()
    }

    fn sample_tree(root: &Path) {
        write_file(root, "css/style.css", b"body { color: red }");
        write_file(root, "js/script.js", b"console.log(1)");
        write_file(root, "robots-extra.txt", b"plain");
        write_file(root, "partials/footer.HTML", b"<footer></footer>");
        write_file(root, "img/cover.jpg", b"fake jpeg bytes");
        write_file(root, "img/nested/diagram.PNG", b"fake png bytes");
        write_file(root, "logos/brand.png", b"outside image prefix");
        write_file(root, "fonts/LICENSE", b"license text");
    }

    #[test]
    fn hashed_output_is_the_bytes_that_were_hashed() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        let dist = tmp.path().join("dist");
        write_file(&root, "css/style.css", b"original");

        let images = images();
        let plan = ImagePlan::from_config(&images).unwrap();
        let files = enumerate_assets(&root)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let planned = plan_assets(&files, &plan, &MockBackend::new()).unwrap();

        // Edited between planning and writing.
        fs::write(root.join("css/style.css"), b"edited later").unwrap();
        materialize(&dist, &planned[0].writes).unwrap();

        let out = planned[0].output.single().unwrap();
        assert_eq!(out, hashed_name("css/style.css", &content_hash(b"original")));
        assert_eq!(fs::read(dist.join(out)).unwrap(), b"original");
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn classify_by_extension_and_prefix() {
        assert_eq!(classify("a.html", "img/"), AssetKind::Passthrough);
        assert_eq!(classify("deep/notes.TXT", "img/"), AssetKind::Passthrough);
        assert_eq!(classify("feed.xml", "img/"), AssetKind::Passthrough);
        assert_eq!(classify("img/a.jpg", "img/"), AssetKind::Image);
        assert_eq!(classify("img/x/a.JPEG", "img/"), AssetKind::Image);
        assert_eq!(classify("img/a.png", "img/"), AssetKind::Image);
        assert_eq!(classify("logos/a.png", "img/"), AssetKind::Hashed);
        assert_eq!(classify("img/a.gif", "img/"), AssetKind::Hashed);
        assert_eq!(classify("css/site.css", "img/"), AssetKind::Hashed);
        assert_eq!(classify("LICENSE", "img/"), AssetKind::Hashed);
        assert_eq!(classify(".htaccess", "img/"), AssetKind::Hashed);
    }

    #[test]
    fn split_stem_keeps_directory() {
        assert_eq!(split_stem("img/a/cover.jpg"), (Some("img/a"), "cover"));
        assert_eq!(split_stem("cover.min.png"), (None, "cover.min"));
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    #[test]
    fn enumerate_yields_sorted_posix_paths() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "b.css", b"b");
        write_file(tmp.path(), "a/z.js", b"z");
        write_file(tmp.path(), "a/y.js", b"y");

        let rels: Vec<_> = enumerate_assets(tmp.path())
            .map(|f| f.unwrap().rel)
            .collect();
        assert_eq!(rels, vec!["a/y.js", "a/z.js", "b.css"]);
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    #[test]
    fn map_has_one_key_per_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        let dist = tmp.path().join("dist");
        sample_tree(&root);

        let backend = MockBackend::new();
        let mut cache = HashCache::empty();
        let outcome =
            process_assets(&root, &dist, &images(), &mut cache, &backend, None).unwrap();

        let keys: Vec<_> = outcome.map.keys().cloned().collect();
        let files = list_files(&root);
        assert_eq!(keys, files);
        assert_eq!(outcome.map.len(), 8);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn outputs_follow_kind_rules() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        let dist = tmp.path().join("dist");
        sample_tree(&root);

        let backend = MockBackend::new();
        let mut cache = HashCache::empty();
        let outcome =
            process_assets(&root, &dist, &images(), &mut cache, &backend, None).unwrap();
        let map = &outcome.map;

        let css_hash = content_hash(b"body { color: red }");
        assert_eq!(
            map["css/style.css"],
            AssetOutput::Single(format!("css/style.{css_hash}.css"))
        );
        assert_eq!(
            map["robots-extra.txt"],
            AssetOutput::Single("robots-extra.txt".into())
        );
        assert!(map["logos/brand.png"].single().unwrap().starts_with("logos/brand."));

        let cover = &map["img/cover.jpg"];
        let sm = cover.variant("sm").unwrap();
        let md = cover.variant("md").unwrap();
        assert!(sm.starts_with("img/cover.sm.") && sm.ends_with(".avif"));
        assert!(md.starts_with("img/cover.md.") && md.ends_with(".avif"));
        assert!(
            map["img/nested/diagram.PNG"]
                .variant("sm")
                .unwrap()
                .starts_with("img/nested/diagram.sm.")
        );

        // Every mapped output exists on disk
        for output in map.values() {
            let paths: Vec<&str> = match output {
                AssetOutput::Single(p) => vec![p],
                AssetOutput::Variants(v) => v.values().map(String::as_str).collect(),
            };
            for p in paths {
                assert!(dist.join(p).is_file(), "missing {p}");
            }
        }
        assert_eq!(
            fs::read(dist.join(format!("css/style.{css_hash}.css"))).unwrap(),
            b"body { color: red }"
        );
    }

    #[test]
    fn two_runs_produce_identical_output() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        sample_tree(&root);
        let backend = MockBackend::new();

        let dist_a = tmp.path().join("a");
        let dist_b = tmp.path().join("b");
        let map_a = process_assets(&root, &dist_a, &images(), &mut HashCache::empty(), &backend, None)
            .unwrap()
            .map;
        let map_b = process_assets(&root, &dist_b, &images(), &mut HashCache::empty(), &backend, None)
            .unwrap()
            .map;

        assert_eq!(map_a, map_b);
        let files_a = list_files(&dist_a);
        assert_eq!(files_a, list_files(&dist_b));
        for f in &files_a {
            assert_eq!(fs::read(dist_a.join(f)).unwrap(), fs::read(dist_b.join(f)).unwrap());
        }
    }

    #[test]
    fn map_serializes_to_plain_json() {
        let mut map = AssetMap::new();
        map.insert("a.css".into(), AssetOutput::Single("a.11111111.css".into()));
        map.insert(
            "img/x.jpg".into(),
            AssetOutput::Variants(BTreeMap::from([(
                "sm".to_string(),
                "img/x.sm.22222222.avif".to_string(),
            )])),
        );
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"a.css":"a.11111111.css","img/x.jpg":{"sm":"img/x.sm.22222222.avif"}}"#
        );
    }

    #[test]
    fn cache_status_feeds_stats() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        let dist = tmp.path().join("dist");
        sample_tree(&root);
        let backend = MockBackend::new();
        let mut cache = HashCache::empty();

        let first = process_assets(&root, &dist, &images(), &mut cache, &backend, None).unwrap();
        assert_eq!(first.stats.new, 4);
        assert_eq!(first.stats.copied, 2);
        assert_eq!(first.stats.images, 2);

        write_file(&root, "css/style.css", b"body { color: blue }");
        let second = process_assets(&root, &dist, &images(), &mut cache, &backend, None).unwrap();
        assert_eq!(second.stats.unchanged, 3);
        assert_eq!(second.stats.changed, 1);
        assert_eq!(second.stats.new, 0);
    }

    #[test]
    fn cache_carries_stale_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        write_file(&root, "a.css", b"a");
        let backend = MockBackend::new();
        let mut cache = HashCache::empty();
        cache.observe("gone.css", "deadbeef");

        process_assets(&root, &tmp.path().join("dist"), &images(), &mut cache, &backend, None)
            .unwrap();
        assert_eq!(cache.get("gone.css"), Some("deadbeef"));
        assert_eq!(cache.get("a.css"), Some(content_hash(b"a").as_str()));
    }

    #[test]
    fn events_are_sent_in_map_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        write_file(&root, "b.txt", b"b");
        write_file(&root, "a.css", b"a");
        let backend = MockBackend::new();
        let (tx, rx) = std::sync::mpsc::channel();

        process_assets(
            &root,
            &tmp.path().join("dist"),
            &images(),
            &mut HashCache::empty(),
            &backend,
            Some(tx),
        )
        .unwrap();

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            AssetEvent::Hashed { rel, status: CacheStatus::New, .. } if rel == "a.css"
        ));
        assert!(matches!(&events[1], AssetEvent::Copied { rel } if rel == "b.txt"));
    }

    #[test]
    fn missing_root_warns_with_empty_map() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let outcome = process_assets(
            &tmp.path().join("nope"),
            &tmp.path().join("dist"),
            &images(),
            &mut HashCache::empty(),
            &backend,
            None,
        )
        .unwrap();
        assert!(outcome.map.is_empty());
        assert!(matches!(
            outcome.warnings.as_slice(),
            [Warning::MissingAssetsDir(_)]
        ));
    }

    #[test]
    fn decode_failure_aborts_before_writing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        let dist = tmp.path().join("dist");
        write_file(&root, "css/a.css", b"a");
        write_file(&root, "img/broken.jpg", b"not a jpeg");

        let result = process_assets(
            &root,
            &dist,
            &images(),
            &mut HashCache::empty(),
            &RustBackend::new(),
            None,
        );
        assert!(matches!(result, Err(AssetError::Image { ref rel, .. }) if rel == "img/broken.jpg"));
        assert!(!dist.exists());
    }

    #[test]
    fn real_png_gets_avif_variants_without_upscaling() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("assets");
        let dist = tmp.path().join("dist");
        write_file(&root, "img/small.png", &png_bytes(64, 32));

        let (tx, rx) = std::sync::mpsc::channel();
        let outcome = process_assets(
            &root,
            &dist,
            &images(),
            &mut HashCache::empty(),
            &RustBackend::new(),
            Some(tx),
        )
        .unwrap();

        let out = &outcome.map["img/small.png"];
        assert!(dist.join(out.variant("sm").unwrap()).is_file());
        assert!(dist.join(out.variant("md").unwrap()).is_file());

        let events: Vec<_> = rx.iter().collect();
        let AssetEvent::Image { variants, .. } = &events[0] else {
            panic!("expected image event, got {:?}", events[0]);
        };
        for v in variants {
            assert_eq!((v.width, v.height), (64, 32));
        }
        assert_eq!(&outcome.variants["img/small.png"], variants);
    }
}
