use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn is_export_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Expands command-line inputs into concrete files: directories are walked
/// for `*.csv`, glob patterns are expanded, plain paths pass through.
/// Order is stable and duplicates are dropped.
pub fn expand_inputs(inputs: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !files.contains(&path) {
            files.push(path);
        }
    };

    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e),
                    Err(e) => {
                        log::error!("Failed to read directory entry under {}: {}", input, e);
                        None
                    }
                })
                .filter(|e| e.file_type().is_file() && is_export_file(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            log::info!("Found {} export files under {}", found.len(), input);
            found.into_iter().for_each(&mut push);
        } else if input.contains('*') || input.contains('?') || input.contains('[') {
            match glob::glob(input) {
                Ok(paths) => {
                    let expanded: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
                    log::info!("Expanded glob {} to {} files", input, expanded.len());
                    expanded.into_iter().for_each(&mut push);
                }
                Err(e) => {
                    log::error!("Invalid glob pattern {}: {}", input, e);
                }
            }
        } else {
            push(path.to_path_buf());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walks_directories_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2024");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("a.csv"), "x").unwrap();
        fs::write(nested.join("b.CSV"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let walked = expand_inputs(&[dir.path().to_string_lossy().into_owned()]);
        assert_eq!(walked.len(), 2);
        assert!(walked.iter().all(|p| is_export_file(p)));

        let pattern = format!("{}/*.csv", dir.path().display());
        let globbed = expand_inputs(&[pattern.clone(), pattern]);
        assert_eq!(globbed, vec![dir.path().join("a.csv")]);
    }

    #[test]
    fn test_plain_paths_pass_through() {
        let inputs = vec!["missing.csv".to_string()];
        assert_eq!(expand_inputs(&inputs), vec![PathBuf::from("missing.csv")]);
    }
}
