//! YOLO dataset directories.
//!
//! Split folders come from the `train`/`val`/`test`/`valid` entries of
//! `data.yaml` when present, otherwise from a scan of the dataset root.
//! Both common layouts are understood:
//!
//! ```text
//! dataset/                          dataset/
//!   data.yaml                         data.yaml
//!   train/images/*.jpg                images/train/*.jpg
//!   train/labels/*.txt                labels/train/*.txt
//! ```
//!
//! A split may also keep images and label files side by side. Class names
//! come from `names` in data.yaml, then `classes.txt`, and are otherwise
//! inferred from the largest class id in the label files.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use super::{Dataset, DatasetError, DatasetItem, DatasetProvider, is_image_file};
use crate::format::parse_yolo_labels;

/// Split names, in load order.
pub const SPLITS: &[&str] = &["train", "val", "test", "valid"];

/// `names` in data.yaml: a list, or a map from class id to name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

/// A split entry in data.yaml: one path or a list of paths.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SplitPaths {
    One(String),
    Many(Vec<String>),
}

impl SplitPaths {
    fn paths(&self) -> Vec<&str> {
        match self {
            SplitPaths::One(path) => vec![path.as_str()],
            SplitPaths::Many(paths) => paths.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DataYaml {
    #[serde(default)]
    names: Option<ClassNames>,
    #[serde(default)]
    train: Option<SplitPaths>,
    #[serde(default)]
    val: Option<SplitPaths>,
    #[serde(default)]
    test: Option<SplitPaths>,
    #[serde(default)]
    valid: Option<SplitPaths>,
}

impl DataYaml {
    fn split(&self, name: &str) -> Option<&SplitPaths> {
        match name {
            "train" => self.train.as_ref(),
            "val" => self.val.as_ref(),
            "test" => self.test.as_ref(),
            "valid" => self.valid.as_ref(),
            _ => None,
        }
    }

    fn has_splits(&self) -> bool {
        SPLITS.iter().any(|s| self.split(s).is_some())
    }
}

/// Image and label folders of one split.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SplitDirs {
    images: PathBuf,
    labels: PathBuf,
}

impl SplitDirs {
    /// Work out where images and labels live for a split path.
    ///
    /// `x/images` pairs with `x/labels`, a folder holding `images/` pairs
    /// with its `labels/`, and `images/x` pairs with `labels/x`. Labels fall
    /// back to the image folder when the paired folder is missing.
    fn resolve(path: &Path) -> Self {
        let images = if path.file_name() != Some(OsStr::new("images"))
            && path.join("images").is_dir()
        {
            path.join("images")
        } else {
            path.to_path_buf()
        };

        let labels = Self::labels_for(&images)
            .filter(|p| p.is_dir())
            .unwrap_or_else(|| images.clone());
        Self { images, labels }
    }

    /// Swap the last `images` component for `labels`.
    fn labels_for(images: &Path) -> Option<PathBuf> {
        let components: Vec<Component<'_>> = images.components().collect();
        let pos = components
            .iter()
            .rposition(|c| c.as_os_str() == OsStr::new("images"))?;
        let mut labels = PathBuf::new();
        for (i, c) in components.iter().enumerate() {
            if i == pos {
                labels.push("labels");
            } else {
                labels.push(c.as_os_str());
            }
        }
        Some(labels)
    }
}

/// Loads YOLO datasets from directories below a base path.
#[derive(Debug, Clone, Default)]
pub struct DirectoryDataset {
    base: PathBuf,
}

impl DirectoryDataset {
    /// Resolve dataset identifiers relative to `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn read_data_yaml(root: &Path) -> Result<Option<DataYaml>, DatasetError> {
        for name in ["data.yaml", "data.yml"] {
            let path = root.join(name);
            if path.is_file() {
                let yaml = serde_yaml::from_str(&std::fs::read_to_string(&path)?)?;
                return Ok(Some(yaml));
            }
        }
        Ok(None)
    }

    /// Read class names from data.yaml, falling back to classes.txt.
    fn class_names(root: &Path, yaml: Option<&DataYaml>) -> Result<Vec<String>, DatasetError> {
        match yaml.and_then(|y| y.names.as_ref()) {
            Some(ClassNames::List(names)) => return Ok(names.clone()),
            Some(ClassNames::Map(map)) => {
                let len = map.keys().next_back().map_or(0, |k| k + 1);
                let mut names: Vec<String> = (0..len).map(|id| format!("class_{}", id)).collect();
                for (id, name) in map {
                    names[*id] = name.clone();
                }
                return Ok(names);
            }
            None => {}
        }

        let classes = root.join("classes.txt");
        if classes.is_file() {
            return Ok(std::fs::read_to_string(&classes)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect());
        }
        Ok(Vec::new())
    }

    /// Name classes `class_0..=class_N` from the largest id in the label files.
    fn infer_class_names(splits: &[SplitDirs]) -> Result<Vec<String>, DatasetError> {
        let mut max_id: Option<usize> = None;
        for dirs in splits {
            for entry in std::fs::read_dir(&dirs.labels)? {
                let path = entry?.path();
                if path.extension() != Some(OsStr::new("txt")) || !path.is_file() {
                    continue;
                }
                let content = std::fs::read_to_string(&path)?;
                let ids = content
                    .lines()
                    .filter_map(|line| line.split_whitespace().next())
                    .filter_map(|token| token.parse::<usize>().ok());
                max_id = max_id.into_iter().chain(ids).max();
            }
        }
        Ok(max_id
            .map(|max| (0..=max).map(|id| format!("class_{}", id)).collect())
            .unwrap_or_default())
    }

    /// Resolve a data.yaml split entry against the dataset root.
    ///
    /// Roboflow exports write `../train/images`; when such a path does not
    /// exist the leading `..` components are dropped.
    fn resolve_yaml_path(root: &Path, entry: &str) -> PathBuf {
        let path = root.join(entry);
        if path.exists() {
            return path;
        }
        let trimmed: PathBuf = Path::new(entry)
            .components()
            .skip_while(|c| matches!(c, Component::ParentDir | Component::CurDir))
            .collect();
        let fallback = root.join(trimmed);
        if fallback.exists() { fallback } else { path }
    }

    /// Split folders declared in data.yaml for `split` that exist on disk.
    fn declared_split(root: &Path, yaml: &DataYaml, split: &str) -> Vec<PathBuf> {
        let Some(entry) = yaml.split(split) else {
            return Vec::new();
        };
        entry
            .paths()
            .into_iter()
            .map(|p| Self::resolve_yaml_path(root, p))
            .filter(|p| {
                let found = p.is_dir();
                if !found {
                    log::warn!("Split '{}' path {:?} does not exist", split, p);
                }
                found
            })
            .collect()
    }

    /// `root/<split>` or `root/images/<split>`, whichever exists.
    fn scanned_split(root: &Path, split: &str) -> Option<PathBuf> {
        [root.join(split), root.join("images").join(split)]
            .into_iter()
            .find(|p| p.is_dir())
    }

    fn split_paths(
        root: &Path,
        yaml: Option<&DataYaml>,
        split: Option<&str>,
    ) -> Result<Vec<PathBuf>, DatasetError> {
        let declared = yaml.filter(|y| y.has_splits());

        let paths = match split {
            Some(split) => {
                let mut paths = declared
                    .map(|y| Self::declared_split(root, y, split))
                    .unwrap_or_default();
                if paths.is_empty() {
                    paths.extend(Self::scanned_split(root, split));
                }
                if paths.is_empty() {
                    return Err(DatasetError::SplitNotFound {
                        split: split.to_string(),
                        path: root.to_path_buf(),
                    });
                }
                paths
            }
            None => {
                let mut paths: Vec<PathBuf> = Vec::new();
                if let Some(yaml) = declared {
                    for split in SPLITS {
                        for path in Self::declared_split(root, yaml, split) {
                            if !paths.contains(&path) {
                                paths.push(path);
                            }
                        }
                    }
                }
                if paths.is_empty() {
                    paths = SPLITS
                        .iter()
                        .filter_map(|s| Self::scanned_split(root, s))
                        .collect();
                }
                if paths.is_empty() {
                    vec![root.to_path_buf()]
                } else {
                    paths
                }
            }
        };
        Ok(paths)
    }

    /// Load every image of one split.
    fn load_split(
        dirs: &SplitDirs,
        class_names: &[String],
    ) -> Result<Vec<DatasetItem>, DatasetError> {
        let mut images: Vec<PathBuf> = std::fs::read_dir(&dirs.images)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        images.sort();

        let mut items = Vec::with_capacity(images.len());
        for path in images {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let label_path = dirs.labels.join(format!("{}.txt", stem));

            let boxes = if label_path.is_file() {
                match image::image_dimensions(&path) {
                    Ok((w, h)) => {
                        let content = std::fs::read_to_string(&label_path)?;
                        parse_yolo_labels(&content, w, h, class_names)
                    }
                    Err(e) => {
                        log::warn!("Cannot read dimensions of {:?}, ignoring labels: {}", path, e);
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            items.push(DatasetItem {
                source: path,
                filename,
                boxes,
            });
        }
        Ok(items)
    }
}

impl DatasetProvider for DirectoryDataset {
    fn load(&self, dataset: &str, split: Option<&str>) -> Result<Dataset, DatasetError> {
        let root = self.base.join(dataset);
        if !root.is_dir() {
            return Err(DatasetError::NotFound { path: root });
        }

        let yaml = Self::read_data_yaml(&root)?;
        let splits: Vec<SplitDirs> = Self::split_paths(&root, yaml.as_ref(), split)?
            .iter()
            .map(|p| SplitDirs::resolve(p))
            .collect();

        let mut class_names = Self::class_names(&root, yaml.as_ref())?;
        if class_names.is_empty() {
            class_names = Self::infer_class_names(&splits)?;
            log::warn!(
                "No class names found in {:?}, using {} generic names",
                root,
                class_names.len()
            );
        }

        let mut items = Vec::new();
        for dirs in &splits {
            let split_items = Self::load_split(dirs, &class_names)?;
            log::debug!(
                "Split {:?} (labels {:?}): {} images",
                dirs.images,
                dirs.labels,
                split_items.len()
            );
            items.extend(split_items);
        }

        log::info!(
            "Loaded dataset {:?}: {} images, {} boxes, {} classes",
            root,
            items.len(),
            items.iter().map(|i| i.boxes.len()).sum::<usize>(),
            class_names.len()
        );
        Ok(Dataset { class_names, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Session;
    use crate::format::ExportOptions;
    use crate::geometry::Rect;
    use crate::services::NativeDecoderThread;

    fn write_image(path: &Path, width: u32, height: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_split_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pets");
        write(&root.join("data.yaml"), "names: [cat, dog]\nnc: 2\n");
        write_image(&root.join("train/images/a.png"), 200, 100);
        write_image(&root.join("train/images/b.png"), 200, 100);
        write(&root.join("train/labels/a.txt"), "1 0.5 0.5 0.25 0.5\n");
        write_image(&root.join("val/images/c.png"), 50, 50);

        let provider = DirectoryDataset::new(dir.path());
        let dataset = provider.load("pets", None).unwrap();

        assert_eq!(dataset.class_names, ["cat", "dog"]);
        assert_eq!(dataset.items.len(), 3);
        assert_eq!(dataset.items[0].filename, "a.png");
        assert_eq!(dataset.items[0].boxes.len(), 1);
        assert_eq!(dataset.items[0].boxes[0].label, "dog");
        assert_eq!(dataset.items[0].boxes[0].rect, Rect::new(75.0, 25.0, 50.0, 50.0));
        assert!(dataset.items[1].boxes.is_empty());
        assert_eq!(dataset.items[2].filename, "c.png");

        let val = provider.load("pets", Some("val")).unwrap();
        assert_eq!(val.items.len(), 1);
    }

    #[test]
    fn test_names_as_map_and_flat_split() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("data.yaml"), "names:\n  0: person\n  2: car\n");
        write_image(&dir.path().join("img.png"), 100, 100);
        write(&dir.path().join("img.txt"), "2 0.5 0.5 0.2 0.2\n0 0.1 0.1 0.1 0.1\n");

        let dataset = DirectoryDataset::default()
            .load(dir.path().to_str().unwrap(), None)
            .unwrap();
        assert_eq!(dataset.class_names, ["person", "class_1", "car"]);
        assert_eq!(dataset.items.len(), 1);
        assert_eq!(dataset.items[0].boxes[0].label, "car");
        assert_eq!(dataset.items[0].boxes[1].label, "person");
    }

    #[test]
    fn test_classes_txt_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("classes.txt"), "alpha\n\nbeta\n");
        write_image(&dir.path().join("train/x.png"), 10, 10);

        let dataset = DirectoryDataset::new(dir.path()).load("", None).unwrap();
        assert_eq!(dataset.class_names, ["alpha", "beta"]);
        assert_eq!(dataset.items.len(), 1);
    }

    #[test]
    fn test_yaml_splits_with_images_first_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("coco8");
        write(
            &root.join("data.yaml"),
            "train: images/train\nval: images/val\nnames:\n  0: person\n  1: car\n",
        );
        write_image(&root.join("images/train/a.png"), 200, 100);
        write(&root.join("labels/train/a.txt"), "1 0.5 0.5 0.25 0.5\n");
        write_image(&root.join("images/val/b.png"), 200, 100);
        write(&root.join("labels/val/b.txt"), "0 0.5 0.5 0.5 0.5\n");

        let provider = DirectoryDataset::new(dir.path());
        let train = provider.load("coco8", Some("train")).unwrap();
        assert_eq!(train.items.len(), 1);
        assert_eq!(train.items[0].filename, "a.png");
        assert_eq!(train.items[0].boxes[0].label, "car");
        assert_eq!(train.items[0].boxes[0].rect, Rect::new(75.0, 25.0, 50.0, 50.0));

        let all = provider.load("coco8", None).unwrap();
        let names: Vec<&str> = all.items.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png"]);
        assert_eq!(all.items[1].boxes[0].label, "person");

        assert!(matches!(
            provider.load("coco8", Some("test")),
            Err(DatasetError::SplitNotFound { .. })
        ));
    }

    #[test]
    fn test_yaml_split_paths_resolved_against_root() {
        let dir = tempfile::tempdir().unwrap();
        // Roboflow style: parent-relative paths, `valid` aliasing `val`
        write(
            &dir.path().join("data.yaml"),
            "train: ../train/images\nval: ../valid/images\nvalid: ../valid/images\nnames: [leaf]\n",
        );
        write_image(&dir.path().join("train/images/t.png"), 40, 40);
        write(&dir.path().join("train/labels/t.txt"), "0 0.5 0.5 0.5 0.5\n");
        write_image(&dir.path().join("valid/images/v.png"), 40, 40);
        // Not declared in data.yaml
        write_image(&dir.path().join("test/images/x.png"), 40, 40);

        let dataset = DirectoryDataset::new(dir.path()).load("", None).unwrap();
        let names: Vec<&str> = dataset.items.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, ["t.png", "v.png"]);
        assert_eq!(dataset.items[0].boxes[0].rect, Rect::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn test_scan_finds_images_first_split() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("classes.txt"), "cat\n");
        write_image(&dir.path().join("images/train/a.png"), 20, 20);
        write(&dir.path().join("labels/train/a.txt"), "0 0.5 0.5 0.5 0.5\n");

        let dataset = DirectoryDataset::new(dir.path())
            .load("", Some("train"))
            .unwrap();
        assert_eq!(dataset.items.len(), 1);
        assert_eq!(dataset.items[0].boxes.len(), 1);
    }

    #[test]
    fn test_class_names_inferred_from_labels() {
        let dir = tempfile::tempdir().unwrap();
        write_image(&dir.path().join("train/images/a.png"), 200, 100);
        write(
            &dir.path().join("train/labels/a.txt"),
            "2 0.5 0.5 0.25 0.5\n0 0.25 0.25 0.1 0.2\n",
        );

        let provider = DirectoryDataset::new(dir.path());
        let dataset = provider.load("", None).unwrap();
        assert_eq!(dataset.class_names, ["class_0", "class_1", "class_2"]);
        assert_eq!(dataset.items[0].boxes[0].label, "class_2");

        let mut session = Session::default();
        let mut decoder = NativeDecoderThread::spawn().unwrap();
        session
            .load_dataset(&provider, "", None, &mut decoder)
            .unwrap();
        while let Some(outcome) = decoder.wait_one() {
            session.apply_decode(outcome).unwrap();
        }

        let result = session.export("yolo", &ExportOptions::new()).unwrap();
        assert_eq!(
            result.file("a.txt").unwrap().content,
            "2 0.500000 0.500000 0.250000 0.500000\n0 0.250000 0.250000 0.100000 0.200000\n"
        );
    }

    #[test]
    fn test_missing_dataset_and_split() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirectoryDataset::new(dir.path());
        assert!(matches!(
            provider.load("nope", None),
            Err(DatasetError::NotFound { .. })
        ));

        std::fs::create_dir(dir.path().join("ds")).unwrap();
        assert!(matches!(
            provider.load("ds", Some("train")),
            Err(DatasetError::SplitNotFound { .. })
        ));
    }
}
