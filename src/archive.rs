// Project archive: copies `.aif` files between the device and a folder per
// project. Every operation works category by category so the UI can report
// progress between steps.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid project name: {0:?}")]
    InvalidName(String),
    #[error("project {0} does not exist")]
    MissingProject(String),
    #[error("{action} {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ArchiveError {
        let path = path.to_path_buf();
        move |source| ArchiveError::Io {
            action,
            path,
            source,
        }
    }
}

/// Content buckets kept on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Tape,
    Drum,
    Synth,
    Album,
}

impl Category {
    /// Categories that make up a project. The album is opt-in on backup
    /// and never restored.
    pub const PROJECT: [Category; 3] = [Category::Tape, Category::Drum, Category::Synth];

    /// Location relative to both the device root and a project folder.
    pub fn rel_path(self) -> PathBuf {
        match self {
            Category::Tape => PathBuf::from("tape"),
            Category::Drum => Path::new("drum").join("user"),
            Category::Synth => Path::new("synth").join("user"),
            Category::Album => PathBuf::from("album"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Tape => "tape",
            Category::Drum => "drum presets",
            Category::Synth => "synth presets",
            Category::Album => "album",
        }
    }
}

/// Number of files moved for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub category: Category,
    pub files: usize,
}

fn is_aif(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("aif"))
}

/// Regular `.aif` files directly inside `dir`, sorted by name. A missing
/// directory has no files.
pub fn aif_files(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArchiveError::io("reading", dir)(e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(ArchiveError::io("reading", dir))?.path();
        if path.is_file() && is_aif(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy every `.aif` file from `src` into the existing directory `dst`.
pub fn copy_aif_files(src: &Path, dst: &Path) -> Result<usize, ArchiveError> {
    let files = aif_files(src)?;
    for file in &files {
        // aif_files only yields paths with a file name
        let Some(name) = file.file_name() else { continue };
        let target = dst.join(name);
        debug!("copying {} to {}", file.display(), target.display());
        fs::copy(file, &target).map_err(ArchiveError::io("copying", file))?;
    }
    Ok(files.len())
}

/// Delete every `.aif` file in `dir`.
pub fn remove_aif_files(dir: &Path) -> Result<usize, ArchiveError> {
    let files = aif_files(dir)?;
    for file in &files {
        debug!("removing {}", file.display());
        fs::remove_file(file).map_err(ArchiveError::io("removing", file))?;
    }
    Ok(files.len())
}

fn create_dir(dir: &Path) -> Result<(), ArchiveError> {
    fs::create_dir_all(dir).map_err(ArchiveError::io("creating", dir))
}

/// The local directory holding one folder per project.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Archive { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project names must name a single folder directly under the root.
    pub fn validate_name(name: &str) -> Result<(), ArchiveError> {
        let mut components = Path::new(name).components();
        let single_component = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if name.contains(['/', '\\']) || !single_component {
            return Err(ArchiveError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether `name` is usable for a new or existing project: valid, and
    /// not taken by something other than a folder.
    pub fn available(&self, name: &str) -> bool {
        if Self::validate_name(name).is_err() {
            return false;
        }
        let dir = self.project_dir(name);
        !dir.exists() || dir.is_dir()
    }

    pub fn exists(&self, name: &str) -> bool {
        Self::validate_name(name).is_ok() && self.project_dir(name).is_dir()
    }

    /// Existing projects, most recently modified first.
    pub fn project_names(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("cannot list {}: {e}", self.root.display());
                return Vec::new();
            }
        };
        let mut projects: Vec<(SystemTime, String)> = entries
            .flatten()
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_dir() {
                    return None;
                }
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, entry.file_name().to_string_lossy().into_owned()))
            })
            .collect();
        projects.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        projects.into_iter().map(|(_, name)| name).collect()
    }

    /// The most recent project whose name starts with `prefix`.
    pub fn complete(&self, prefix: &str) -> Option<String> {
        self.project_names()
            .into_iter()
            .find(|name| name.starts_with(prefix))
    }

    /// Copy the device's project content into the named project folder,
    /// creating it as needed. Existing files with the same name are
    /// overwritten.
    pub fn backup(
        &self,
        device: &Path,
        name: &str,
        album: bool,
        mut on_step: impl FnMut(Category),
    ) -> Result<Vec<StepReport>, ArchiveError> {
        if !self.available(name) {
            return Err(ArchiveError::InvalidName(name.to_string()));
        }
        let project = self.project_dir(name);
        create_dir(&project)?;

        let mut categories = Category::PROJECT.to_vec();
        if album {
            categories.push(Category::Album);
        }

        let mut reports = Vec::with_capacity(categories.len());
        for category in categories {
            on_step(category);
            let dst = project.join(category.rel_path());
            create_dir(&dst)?;
            let files = copy_aif_files(&device.join(category.rel_path()), &dst)?;
            info!("backed up {files} {} files to {}", category.label(), dst.display());
            reports.push(StepReport { category, files });
        }
        Ok(reports)
    }

    /// Replace device content with the named project. Categories the
    /// project has no folder for are left untouched on the device.
    pub fn restore(
        &self,
        device: &Path,
        name: &str,
        mut on_step: impl FnMut(Category),
    ) -> Result<Vec<StepReport>, ArchiveError> {
        if !self.exists(name) {
            return Err(ArchiveError::MissingProject(name.to_string()));
        }
        let project = self.project_dir(name);

        let mut reports = Vec::new();
        for category in Category::PROJECT {
            let src = project.join(category.rel_path());
            if !src.is_dir() {
                debug!("{} has no {} folder, skipping", name, category.label());
                continue;
            }
            on_step(category);
            let dst = device.join(category.rel_path());
            remove_aif_files(&dst)?;
            create_dir(&dst)?;
            let files = copy_aif_files(&src, &dst)?;
            info!("restored {files} {} files from {}", category.label(), src.display());
            reports.push(StepReport { category, files });
        }
        Ok(reports)
    }

    /// Delete every tape track on the device.
    pub fn erase_tape(device: &Path) -> Result<usize, ArchiveError> {
        let removed = remove_aif_files(&device.join(Category::Tape.rel_path()))?;
        info!("erased {removed} tape files");
        Ok(removed)
    }
}
