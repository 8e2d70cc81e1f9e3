use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ZliConfig;

/// Always excluded from command discovery.
pub const DEFAULT_EXCLUDES: &[&str] = &["**/node_modules/**", "**/node_modules"];

/// Which files under the command root count as command files.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    extensions: HashSet<String>,
    exclude: GlobSet,
}

impl DiscoveryOptions {
    pub fn new<I, S>(extensions: I, exclude: &[String]) -> Result<Self, globset::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES
            .iter()
            .copied()
            .chain(exclude.iter().map(String::as_str))
        {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            exclude: builder.build()?,
        })
    }

    pub fn from_config(config: &ZliConfig) -> Result<Self, globset::Error> {
        Self::new(&config.extensions, &config.exclude)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude.is_match(relative)
    }
}

/// All command files under `root`, depth-first in case-insensitive name order.
pub fn command_files(root: &Path, options: &DiscoveryOptions) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    gather_files(root, root, options, &mut files)?;
    Ok(files)
}

pub fn gather_files(
    dir: &Path,
    root: &Path,
    options: &DiscoveryOptions,
    files: &mut Vec<PathBuf>,
) -> io::Result<()> {
    let mut dir_entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .collect();

    dir_entries.sort_by(|a, b| {
        a.file_name()
            .to_string_lossy()
            .to_lowercase()
            .cmp(&b.file_name().to_string_lossy().to_lowercase())
    });

    for entry in dir_entries {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if options.is_excluded(relative) {
            continue;
        }
        if path.is_file() {
            if options.matches_extension(&path) {
                files.push(path);
            }
            continue;
        }
        if path.is_dir() {
            gather_files(&path, root, options, files)?;
        }
    }

    Ok(())
}

/// Path components of `file` relative to `root`, file name included.
pub fn path_segments(root: &Path, file: &Path) -> Vec<String> {
    file.strip_prefix(root)
        .unwrap_or(file)
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect()
}
